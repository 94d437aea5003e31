use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use teamdesk_core::connection::ConnectionEvent;
use teamdesk_core::error::CoreError;
use teamdesk_core::identity::CallerIdentity;
use teamdesk_core::messages::ClientMessage;

use crate::error::AppError;
use crate::middleware::auth::{bearer_token, resolve_identity};
use crate::state::AppState;
use crate::ws::manager::{Admission, WsManager};

/// How long a closing connection may take to flush its last frames.
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct WsAuthQuery {
    token: Option<String>,
}

/// Identity of a WebSocket caller, resolved before the upgrade.
///
/// Browsers cannot set headers on a WebSocket handshake, so besides the
/// `Authorization` header the token may arrive as the `token` query
/// parameter. A request with neither is refused with 401.
pub struct WsCaller(pub CallerIdentity);

impl FromRequestParts<AppState> for WsCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let query_token = Query::<WsAuthQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token);

        let token = match bearer_token(&parts.headers)? {
            Some(token) => token.to_string(),
            None => query_token.ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "WebSocket connections require a session".into(),
                ))
            })?,
        };

        Ok(WsCaller(resolve_identity(&token, state)?))
    }
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The caller identity is resolved first; unauthenticated requests never
/// reach the registry.
pub async fn ws_handler(
    WsCaller(identity): WsCaller,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, identity, state.ws_manager))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Admits the connection into `WsManager` and tells admins.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound messages until the peer leaves or the server
///      cancels the connection (kick, liveness timeout).
///   4. Removes the connection and lets the sender flush its last frames.
async fn handle_socket(socket: WebSocket, identity: CallerIdentity, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        conn_id = %conn_id,
        user_id = identity.user_id,
        username = %identity.username,
        "WebSocket connected"
    );

    let Admission {
        receiver: mut rx,
        cancel,
    } = ws_manager.admit(conn_id.clone(), Some(identity)).await;
    ws_manager.notify_presence_changed().await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Receiver loop: process inbound messages.
    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break ConnectionEvent::Removed,
            next = stream.next() => match next {
                None | Some(Ok(Message::Close(_))) => break ConnectionEvent::TransportClosed,
                Some(Ok(Message::Text(text))) => match ClientMessage::decode(text.as_str()) {
                    Ok(ClientMessage::Pong(_)) => {
                        tracing::trace!(conn_id = %conn_id, "Pong received");
                        ws_manager.touch(&conn_id).await;
                    }
                    Ok(ClientMessage::Other(kind)) => {
                        tracing::trace!(conn_id = %conn_id, kind = %kind, "Ignoring client message");
                    }
                    Err(_) => {
                        tracing::trace!(conn_id = %conn_id, "Dropping malformed message");
                    }
                },
                Some(Ok(Message::Pong(_))) => ws_manager.touch(&conn_id).await,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break ConnectionEvent::TransportError;
                }
            }
        }
    };

    // A server-side eviction already removed the entry and notified admins.
    if ws_manager.remove(&conn_id).await.is_some() {
        ws_manager.notify_presence_changed().await;
    }

    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
    tracing::info!(conn_id = %conn_id, reason = ?end, "WebSocket disconnected");
}
