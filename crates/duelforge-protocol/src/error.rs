//! Error types for the protocol layer.
//!
//! Each Duelforge crate defines its own error enum, so a `ProtocolError`
//! always means serialization went wrong, never networking or session
//! bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (Rust value → bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (bytes → Rust value). Malformed JSON,
    /// unknown `event` tags and missing fields all land here.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded fine but breaks a protocol rule, e.g. a first
    /// event that isn't a handshake or a version mismatch.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
