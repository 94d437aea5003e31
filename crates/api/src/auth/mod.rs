//! Authentication primitives.
//!
//! - [`jwt`] -- session token validation and the claims-to-identity mapping.

pub mod jwt;
