//! Helpers that put wire types into request bodies and pull error
//! messages out of responses.

use postzen_protocol::{ApiErrorResponse, Codec, ProtocolError};
use postzen_transport::{ApiRequest, ApiResponse};
use serde::Serialize;

/// Encodes `body` with `codec` and attaches it, with its content type, to
/// `request`.
pub fn json_request<C: Codec, B: Serialize>(
    codec: &C,
    request: ApiRequest,
    body: &B,
) -> Result<ApiRequest, ProtocolError> {
    let bytes = codec.encode(body)?;
    Ok(request
        .with_header("Content-Type", codec.content_type())
        .with_body(bytes))
}

/// Best human-readable message for a failed response: the backend's
/// [`ApiErrorResponse`] when the body is one, otherwise the raw body, and
/// for an empty body the status code.
pub fn error_message<C: Codec>(codec: &C, response: &ApiResponse) -> String {
    if let Ok(err) = codec.decode::<ApiErrorResponse>(&response.body) {
        return err.to_string();
    }
    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        text.to_string()
    }
}
