//! Codec trait and the JSON implementation.
//!
//! A codec turns envelopes into bytes and back. The connection layer only
//! talks to the [`Codec`] trait, so the wire format can change without
//! touching rooms or game state.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON via `serde_json`.
///
/// ```rust
/// use doodle_protocol::{Codec, Inbound, JsonCodec, Outbound};
///
/// let codec = JsonCodec;
///
/// let inbound: Inbound = codec
///     .decode(br#"{"code": "text", "msg": {"text": "hello"}}"#)
///     .unwrap();
/// assert_eq!(inbound.code(), "text");
///
/// let bytes = codec.encode(&Outbound::error(404, "room not found")).unwrap();
/// assert!(String::from_utf8(bytes).unwrap().contains("\"code\":\"error\""));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
