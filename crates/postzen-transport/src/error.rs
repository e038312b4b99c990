/// Errors that can occur in the transport layer.
///
/// A transport error means no HTTP response was obtained at all. Any
/// response the server did send, including 4xx and 5xx ones, is an
/// [`ApiResponse`](crate::ApiResponse), not an error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent (connection refused, DNS, TLS, timeout).
    #[error("request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The target could not be turned into a URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response head arrived but reading the body failed.
    #[error("failed to read response body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps any error as a [`TransportError::Request`].
    pub fn request(
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Request(err.into())
    }
}
