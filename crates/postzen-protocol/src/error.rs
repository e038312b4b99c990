//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire types.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: an HTML error page where JSON was expected, missing
    /// required fields, or an unknown role string.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded but is not acceptable, e.g. an auth response
    /// with an empty access token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
