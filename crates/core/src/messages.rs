//! WebSocket message vocabulary.
//!
//! Every frame is a JSON envelope `{ "type": ..., "data": ... }` with `data`
//! optional. The set of message types is fixed: [`ServerMessage`] for
//! server-to-client traffic and [`ClientMessage`] for the replies we act on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire type strings.
pub mod message_types {
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const LOGIN: &str = "login";
    pub const REFRESH_ACTIVE_USERS: &str = "REFRESH_ACTIVE_USERS";
    pub const UPDATE_CHART: &str = "UPDATE_CHART";
    pub const KICK: &str = "KICK";
}

/// The raw `{ type, data? }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WsEnvelope {
    pub fn new(kind: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Decode a text frame. Callers drop frames that fail to decode.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> String {
        // An envelope of a string and a JSON value always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Messages the server pushes to connected clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Liveness probe; the peer must answer with `pong`.
    Ping,
    /// A user logged in (admins only).
    Login(String),
    /// The set of active connections changed.
    RefreshActiveUsers,
    /// Task data changed and charts should be reloaded.
    UpdateChart(Option<Value>),
    /// Terminal: the peer must not reconnect. Carries a human-readable reason.
    Kick(String),
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Ping => message_types::PING,
            ServerMessage::Login(_) => message_types::LOGIN,
            ServerMessage::RefreshActiveUsers => message_types::REFRESH_ACTIVE_USERS,
            ServerMessage::UpdateChart(_) => message_types::UPDATE_CHART,
            ServerMessage::Kick(_) => message_types::KICK,
        }
    }

    pub fn to_envelope(&self) -> WsEnvelope {
        let data = match self {
            ServerMessage::Ping | ServerMessage::RefreshActiveUsers => None,
            ServerMessage::Login(text) | ServerMessage::Kick(text) => {
                Some(Value::String(text.clone()))
            }
            ServerMessage::UpdateChart(data) => data.clone(),
        };
        WsEnvelope::new(self.kind(), data)
    }

    pub fn to_json(&self) -> String {
        self.to_envelope().encode()
    }

    /// Interpret an envelope received by a client. Unknown types yield `None`.
    pub fn from_envelope(envelope: WsEnvelope) -> Option<Self> {
        let text = |data: Option<Value>| match data {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        match envelope.kind.as_str() {
            message_types::PING => Some(ServerMessage::Ping),
            message_types::LOGIN => Some(ServerMessage::Login(text(envelope.data))),
            message_types::REFRESH_ACTIVE_USERS => Some(ServerMessage::RefreshActiveUsers),
            message_types::UPDATE_CHART => Some(ServerMessage::UpdateChart(envelope.data)),
            message_types::KICK => Some(ServerMessage::Kick(text(envelope.data))),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerMessage::Kick(_))
    }
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Liveness answer, echoing the ping's `data` if there was any.
    Pong(Option<Value>),
    /// Any other type. The server ignores these.
    Other(String),
}

impl ClientMessage {
    pub fn from_envelope(envelope: WsEnvelope) -> Self {
        match envelope.kind.as_str() {
            message_types::PONG => ClientMessage::Pong(envelope.data),
            _ => ClientMessage::Other(envelope.kind),
        }
    }

    /// Decode a text frame sent by a client.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        WsEnvelope::decode(text).map(Self::from_envelope)
    }

    pub fn to_json(&self) -> String {
        match self {
            ClientMessage::Pong(data) => WsEnvelope::new(message_types::PONG, data.clone()).encode(),
            ClientMessage::Other(kind) => WsEnvelope::new(kind.clone(), None).encode(),
        }
    }
}
