//! Authentication boundary.
//!
//! Duelforge doesn't validate identities itself; an external identity
//! service issues tokens and the server trusts whatever subject your
//! [`Authenticator`] derives from them. The coordinator stores the
//! subject next to the connection but never makes decisions on it.

use std::fmt;

use crate::SessionError;

/// Opaque identity of the account behind a connection, as issued by the
/// identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates a client's handshake token and returns its subject.
///
/// # Example
///
/// ```rust
/// use duelforge_session::{Authenticator, SessionError, SubjectId};
///
/// /// Accepts any non-empty token as the subject. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(
///         &self,
///         token: &str,
///     ) -> Result<SubjectId, SessionError> {
///         if token.is_empty() {
///             return Err(SessionError::AuthFailed("empty token".into()));
///         }
///         Ok(SubjectId(token.to_string()))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Resolves a token (JWT, API key, ...) to a subject.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] when the token is rejected.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<SubjectId, SessionError>> + Send;
}
