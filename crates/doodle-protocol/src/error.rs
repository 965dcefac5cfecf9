//! Error types for the protocol layer.
//!
//! Each crate in Doodle defines its own error enum. A `ProtocolError`
//! always means the bytes or the envelope shape were wrong, never that a
//! room or game rule rejected the message.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing `code`, or a payload
    /// whose fields don't match the code (e.g. `x` outside `u16`).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope carried a `code` outside the known set.
    #[error("unknown message code `{0}`")]
    UnknownCode(String),

    /// The message is well-formed but not allowed where it was sent.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// HTTP-style status reported to the client in an `error` envelope.
    pub fn status(&self) -> u16 {
        match self {
            Self::Encode(_) => 500,
            Self::Decode(_) | Self::UnknownCode(_) | Self::InvalidMessage(_) => 400,
        }
    }
}
