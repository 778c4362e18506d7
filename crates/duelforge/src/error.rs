//! Unified error type for the Duelforge server.

use duelforge_coordinator::ConfigError;
use duelforge_protocol::ProtocolError;
use duelforge_session::SessionError;
use duelforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically inside the server and connection handler.
#[derive(Debug, thiserror::Error)]
pub enum DuelforgeError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, admission, relay).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server was configured with values it refuses to run with.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let duelforge_err: DuelforgeError = err.into();
        assert!(matches!(duelforge_err, DuelforgeError::Transport(_)));
        assert!(duelforge_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let duelforge_err: DuelforgeError = err.into();
        assert!(matches!(duelforge_err, DuelforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error_keeps_message() {
        let err = SessionError::AuthFailed("nope".into());
        let duelforge_err: DuelforgeError = err.into();
        assert!(matches!(duelforge_err, DuelforgeError::Session(_)));
        assert_eq!(duelforge_err.to_string(), "authentication failed: nope");
    }

    #[test]
    fn test_from_config_error() {
        let duelforge_err: DuelforgeError = ConfigError::SessionIdTooShort(1).into();
        assert!(matches!(duelforge_err, DuelforgeError::Config(_)));
        assert!(duelforge_err.to_string().starts_with("invalid configuration"));
    }
}
