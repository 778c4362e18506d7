//! Error types for the session layer.

use duelforge_protocol::SessionId;
use duelforge_transport::ConnectionId;

/// Errors surfaced by session operations.
///
/// Every variant except `AuthFailed` is a caller-input error: the
/// requesting connection gets a single `error` event and stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No open session has this id (never existed, or already closed).
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session already has two participants or is past its
    /// joinable phase.
    #[error("session {0} is full")]
    SessionFull(SessionId),

    /// The connection is not a participant of the session it addressed.
    #[error("{0} is not a participant of session {1}")]
    NotAParticipant(ConnectionId, SessionId),

    /// The connection already belongs to an open session.
    #[error("{0} is already in session {1}")]
    AlreadyInSession(ConnectionId, SessionId),

    /// The session is still waiting for its second participant, so there
    /// is nobody to relay to.
    #[error("session {0} has not started")]
    SessionNotActive(SessionId),

    /// The id generator kept producing ids that are already taken. Only
    /// happens with a tiny id space or a broken custom generator.
    #[error("no free session id after {0} attempts")]
    IdSpaceExhausted(usize),
}

impl SessionError {
    /// HTTP-style status code reported in the `error` event.
    pub fn code(&self) -> u16 {
        match self {
            Self::AuthFailed(_) => 401,
            Self::NotAParticipant(..) => 403,
            Self::SessionNotFound(_) => 404,
            Self::SessionFull(_)
            | Self::AlreadyInSession(..)
            | Self::SessionNotActive(_) => 409,
            Self::IdSpaceExhausted(_) => 503,
        }
    }
}
