//! Domain building blocks for the teamdesk real-time core.
//!
//! Nothing in this crate performs I/O: it holds the identity and role model,
//! the advisory lock table, the WebSocket message vocabulary and the
//! per-connection state machine so that the API server and the client crate
//! agree on the same types.

pub mod connection;
pub mod error;
pub mod identity;
pub mod locks;
pub mod messages;
pub mod realtime;
pub mod roles;
pub mod types;
