//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A codec converts between Rust types and raw bytes. The rest of the
//! server only depends on the [`Codec`] trait, so the wire format can be
//! swapped without touching the coordinator or the handler.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Browser clients speak JSON natively, so this is the default.
///
/// ## Example
///
/// ```rust
/// use duelforge_protocol::{ClientEvent, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::new(1, 5000, ClientEvent::CreateGame);
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<ClientEvent> = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientEvent, Envelope, ServerEvent, SessionId};

    #[test]
    fn test_json_codec_decodes_browser_frame() {
        let frame = br#"{"seq":1,"timestamp":10,"payload":{"event":"joinGame","gameId":"abc"}}"#;
        let env: Envelope<ClientEvent> = JsonCodec.decode(frame).unwrap();
        assert_eq!(
            env.payload,
            ClientEvent::JoinGame {
                game_id: SessionId::from("abc")
            }
        );
    }

    #[test]
    fn test_json_codec_relay_payload_survives_unchanged() {
        let payload = br#"{"from":"e2","to":"e4"}"#.to_vec();
        let env = Envelope::new(
            7,
            0,
            ServerEvent::UpdateBoard {
                game_id: SessionId::from("abc"),
                payload: payload.clone(),
            },
        );
        let bytes = JsonCodec.encode(&env).unwrap();
        let back: Envelope<ServerEvent> = JsonCodec.decode(&bytes).unwrap();
        match back.payload {
            ServerEvent::UpdateBoard { payload: p, .. } => assert_eq!(p, payload),
            other => panic!("expected UpdateBoard, got {other:?}"),
        }
    }

    #[test]
    fn test_json_codec_garbage_is_decode_error() {
        let result: Result<Envelope<ClientEvent>, _> =
            JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
