//! Fixed-delay reconnection for the real-time channel.
//!
//! After an unexpected close the client waits [`ReconnectConfig::delay`]
//! and connects again, asking the token source for a fresh token each time.
//! A `KICK` from the server ends the loop for good, and so does the
//! [`CancellationToken`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use teamdesk_core::messages::ServerMessage;
use teamdesk_core::realtime::RECONNECT_DELAY_SECS;

use crate::client::{ClientError, RealtimeClient};
use crate::session::{run_session, SessionEnd};

/// Tunable parameters of the reconnect loop.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Constant wait between a disconnect and the next attempt.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(RECONNECT_DELAY_SECS),
        }
    }
}

/// How [`run_with_reconnect`] finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// The server kicked this client; carries the reason.
    Kicked(String),
    /// The cancellation token fired.
    Cancelled,
}

/// Keep a session alive until kicked or cancelled.
///
/// Failed attempts (including a refused session) and ordinary closes are
/// followed by the same fixed delay; there is no exponential growth.
pub async fn run_with_reconnect<F>(
    client: &RealtimeClient,
    config: &ReconnectConfig,
    mut on_message: F,
    cancel: &CancellationToken,
) -> ReconnectOutcome
where
    F: FnMut(ServerMessage),
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let connected = tokio::select! {
            _ = cancel.cancelled() => return ReconnectOutcome::Cancelled,
            result = client.connect() => result,
        };

        match connected {
            Ok(conn) => {
                attempt = 0;
                let end = tokio::select! {
                    _ = cancel.cancelled() => return ReconnectOutcome::Cancelled,
                    end = run_session(conn, &mut on_message) => end,
                };
                match end {
                    SessionEnd::Kicked(reason) => return ReconnectOutcome::Kicked(reason),
                    SessionEnd::Closed => tracing::warn!(
                        delay_ms = config.delay.as_millis() as u64,
                        "WebSocket closed, reconnecting"
                    ),
                }
            }
            Err(ClientError::Refused) => {
                tracing::warn!(attempt, "Session refused, will retry with a fresh token");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
            }
        }

        // Wait before the next attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return ReconnectOutcome::Cancelled,
            _ = tokio::time::sleep(config.delay) => {}
        }
    }
}
