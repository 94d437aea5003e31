//! Drive one established connection until it ends.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use teamdesk_core::messages::{message_types, ClientMessage, ServerMessage, WsEnvelope};

use crate::client::RealtimeConnection;

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server sent `KICK`. Terminal: do not reconnect.
    Kicked(String),
    /// The connection closed or failed for any other reason.
    Closed,
}

/// Process messages until the connection ends.
///
/// Every `ping` is answered with a `pong` echoing the ping's `data`.
/// `KICK` ends the session immediately. Other known messages are passed to
/// `on_message`; undecodable or unknown frames are dropped.
pub async fn run_session<F>(conn: RealtimeConnection, mut on_message: F) -> SessionEnd
where
    F: FnMut(ServerMessage),
{
    let (mut sink, mut stream) = conn.ws_stream.split();

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive error");
                break;
            }
        };

        let Ok(envelope) = WsEnvelope::decode(&text) else {
            tracing::trace!("Dropping malformed server message");
            continue;
        };

        if envelope.kind == message_types::PING {
            let pong = ClientMessage::Pong(envelope.data).to_json();
            if let Err(e) = sink.send(Message::Text(pong)).await {
                tracing::debug!(error = %e, "Failed to answer ping");
                break;
            }
            continue;
        }

        match ServerMessage::from_envelope(envelope) {
            Some(ServerMessage::Kick(reason)) => {
                tracing::warn!(reason = %reason, "Kicked by server");
                return SessionEnd::Kicked(reason);
            }
            Some(message) => on_message(message),
            None => tracing::trace!("Ignoring unknown server message"),
        }
    }

    SessionEnd::Closed
}
