//! Lifecycle of one real-time connection.
//!
//! ```text
//! Connecting --Admitted--> Open --Kicked / LivenessTimeout--> Closing
//!     |                     |                                   |
//!     +--TransportClosed/Error--+--TransportClosed/Error/Removed--+--> Closed
//! ```
//!
//! `Closed` absorbs every event so teardown paths may race harmlessly.

use serde::Serialize;

use crate::error::CoreError;

/// State of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Upgrade accepted, identity not yet registered.
    Connecting,
    /// Registered; receives pings and broadcasts.
    Open,
    /// Being torn down by the server; no further sends except the final ones.
    Closing,
    /// Gone from the registry.
    Closed,
}

/// Something that happened to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Admitted,
    Kicked,
    LivenessTimeout,
    TransportClosed,
    TransportError,
    Removed,
}

impl ConnectionState {
    /// Apply `event`, returning the next state or an error for an
    /// impossible transition.
    pub fn on(self, event: ConnectionEvent) -> Result<ConnectionState, CoreError> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Closed, _) => Ok(Closed),
            (Connecting, Admitted) => Ok(Open),
            (Connecting, TransportClosed | TransportError) => Ok(Closed),
            (Open, Kicked | LivenessTimeout) => Ok(Closing),
            (Closing, Kicked | LivenessTimeout) => Ok(Closing),
            (Open | Closing, TransportClosed | TransportError | Removed) => Ok(Closed),
            (state, event) => Err(CoreError::Conflict(format!(
                "Invalid connection transition: {event:?} in state {state:?}"
            ))),
        }
    }

    /// Whether the server may still push ordinary traffic (pings, broadcasts).
    pub fn accepts_traffic(self) -> bool {
        self == ConnectionState::Open
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::ConnectionEvent::*;
    use super::ConnectionState::*;
    use super::*;

    #[test]
    fn happy_path() {
        let state = Connecting.on(Admitted).unwrap();
        assert_eq!(state, Open);
        assert!(state.accepts_traffic());
        assert_eq!(state.on(TransportClosed).unwrap(), Closed);
    }

    #[test]
    fn kick_goes_through_closing() {
        let closing = Open.on(Kicked).unwrap();
        assert_eq!(closing, Closing);
        assert!(!closing.accepts_traffic());
        assert_eq!(closing.on(Removed).unwrap(), Closed);
    }

    #[test]
    fn timeout_goes_through_closing() {
        assert_eq!(Open.on(LivenessTimeout).unwrap(), Closing);
    }

    #[test]
    fn handshake_failure_closes() {
        assert_eq!(Connecting.on(TransportError).unwrap(), Closed);
    }

    #[test]
    fn closed_absorbs_everything() {
        for event in [Admitted, Kicked, LivenessTimeout, TransportClosed, TransportError, Removed] {
            assert_eq!(Closed.on(event).unwrap(), Closed);
        }
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        assert_matches!(Connecting.on(Kicked), Err(CoreError::Conflict(_)));
        assert_matches!(Open.on(Admitted), Err(CoreError::Conflict(_)));
        assert_matches!(Connecting.on(Removed), Err(CoreError::Conflict(_)));
    }
}
