//! Codec trait and implementations for serializing/deserializing wire
//! types.
//!
//! The layers above never call `serde_json` directly; they go through a
//! [`Codec`], so request bodies and response bodies are handled in one
//! place and a test can swap the format without touching the pipeline.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside long-lived shared
/// client state and is used from any task.
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
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// MIME type to announce for encoded bodies.
    fn content_type(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`), the format the PostZen
/// backend speaks.
///
/// ## Example
///
/// ```rust
/// use postzen_protocol::{Codec, JsonCodec, LoginRequest};
///
/// let codec = JsonCodec;
/// let body = codec
///     .encode(&LoginRequest {
///         email: "ana@example.com".into(),
///         password: "hunter22".into(),
///     })
///     .unwrap();
///
/// assert_eq!(
///     body,
///     br#"{"email":"ana@example.com","password":"hunter22"}"#
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
