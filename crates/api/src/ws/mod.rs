//! WebSocket infrastructure for real-time presence and notifications.
//!
//! Provides the connection registry, the liveness monitor, and the HTTP
//! upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{ws_handler, WsCaller};
pub use heartbeat::start_heartbeat;
pub use manager::{LockRelease, WsManager};
