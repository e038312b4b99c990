//! Unified error type for the PostZen client.

use postzen_client::{AuthError, RefreshError, RequestError};
use postzen_protocol::ProtocolError;
use postzen_router::RouterError;
use postzen_session::SessionError;
use postzen_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PostzenError {
    /// No response was obtained (connection refused, timeout, bad URL).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// An `/auth/*` call was refused or failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The session could not be extended.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// A resource request failed authorization after recovery.
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Router(#[from] RouterError),

    /// A typed helper received a non-2xx response.
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// The client was built with missing or invalid settings.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl PostzenError {
    /// `true` when the session is gone and the user must sign in again.
    pub fn is_session_expired(&self) -> bool {
        match self {
            PostzenError::Request(e) => e.is_authorization_failure(),
            PostzenError::Refresh(_) => true,
            PostzenError::Status { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            PostzenError::Status { status, .. } => Some(*status),
            PostzenError::Auth(AuthError::Rejected { status, .. }) => Some(*status),
            PostzenError::Request(RequestError::AuthorizationFailed(r)) => Some(r.status),
            PostzenError::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
