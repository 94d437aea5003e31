//! Real-time channel constants.
//!
//! Shared by the server (liveness monitor, upgrade route) and the client
//! crate (reconnect loop) so both ends agree on the same cadence.

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

/// Interval between application-level `ping` messages (in seconds).
pub const PING_INTERVAL_SECS: u64 = 10;

/// Maximum silence before a connection is evicted (in seconds).
///
/// Three missed pings at the default interval.
pub const LIVENESS_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Client behaviour
// ---------------------------------------------------------------------------

/// Fixed delay before a client reconnects after an unexpected close.
pub const RECONNECT_DELAY_SECS: u64 = 3;

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Path of the WebSocket upgrade endpoint.
pub const WS_PATH: &str = "/api/ws";

/// Reason sent with `KICK` when the admin does not supply one.
pub const DEFAULT_KICK_REASON: &str = "You have been disconnected by an administrator";

/// Text of the `login` notification pushed to admins.
pub const LOGIN_NOTICE: &str = "New user successfully logged in";
