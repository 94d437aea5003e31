//! WebSocket client for the teamdesk real-time channel.
//!
//! [`RealtimeClient`] holds the server address and a [`TokenSource`]. Every
//! call to [`RealtimeClient::connect`] asks the source for a fresh session
//! token, so an expired or revoked session is refused by the server at
//! admission instead of silently reusing stale credentials.

use std::sync::Arc;

use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{connect_async, MaybeTlsStream};
use teamdesk_core::realtime::WS_PATH;

/// Supplies the session token for each connection attempt.
pub trait TokenSource: Send + Sync {
    /// Current token, or `None` when the user is signed out.
    fn token(&self) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A token that never changes.
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Configuration handle for the real-time endpoint.
#[derive(Clone)]
pub struct RealtimeClient {
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

/// A live WebSocket connection to the server.
#[derive(Debug)]
pub struct RealtimeConnection {
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl RealtimeClient {
    /// Create a client.
    ///
    /// * `base_url` - WebSocket base URL, e.g. `ws://host:3000`.
    /// * `tokens`   - where to get the session token for each attempt.
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full upgrade URL for `token`.
    pub fn ws_url(&self, token: &str) -> String {
        format!("{}{}?token={}", self.base_url, WS_PATH, token)
    }

    /// Connect with a freshly resolved token.
    pub async fn connect(&self) -> Result<RealtimeConnection, ClientError> {
        let token = self.tokens.token().ok_or(ClientError::NoSession)?;
        let url = self.ws_url(&token);

        let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| match e {
            tokio_tungstenite::tungstenite::Error::Http(response)
                if response.status() == StatusCode::UNAUTHORIZED =>
            {
                ClientError::Refused
            }
            other => ClientError::Connection(format!(
                "Failed to connect to {}: {other}",
                self.base_url
            )),
        })?;

        tracing::info!("Connected to {}{}", self.base_url, WS_PATH);
        Ok(RealtimeConnection { ws_stream })
    }
}

/// Errors that can occur when working with the real-time or lock clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The token source has no session.
    #[error("No session available")]
    NoSession,

    /// The server refused admission (expired or invalid session).
    #[error("Session refused by server")]
    Refused,

    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An HTTP call to the lock API failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
