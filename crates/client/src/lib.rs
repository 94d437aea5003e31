//! Client side of the teamdesk real-time channel and lock API.
//!
//! Provides the WebSocket connection with ping answering, a fixed-delay
//! reconnect loop that treats `KICK` as terminal, and an HTTP client for
//! record locks.

pub mod client;
pub mod locks;
pub mod reconnect;
pub mod session;

pub use client::{ClientError, RealtimeClient, RealtimeConnection, TokenSource};
pub use locks::LockClient;
pub use reconnect::{run_with_reconnect, ReconnectConfig, ReconnectOutcome};
pub use session::{run_session, SessionEnd};
