//! Error types for the client layer.

use postzen_protocol::ProtocolError;
use postzen_transport::{ApiResponse, TransportError};

/// A failed call to one of the `/auth/*` endpoints.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server answered with a non-2xx status (bad credentials, email
    /// already registered, revoked refresh token).
    #[error("auth request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request body could not be encoded or the reply decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Why a refresh exchange produced no new access token.
///
/// `Clone` because one outcome is handed to every caller that joined the
/// same exchange. Apart from `NoRefreshCredential` all of these mean the
/// session has expired and has been cleared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// There was no refresh token to exchange. No request was made.
    #[error("no session to refresh")]
    NoRefreshCredential,

    /// The auth endpoint refused the refresh token (expired, revoked,
    /// unknown).
    #[error("session expired: refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The auth endpoint could not be reached.
    #[error("session expired: auth endpoint unreachable: {0}")]
    Unreachable(String),

    /// The auth endpoint answered 2xx with a body that is not a usable
    /// session.
    #[error("session expired: invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The exchange task ended without settling (it panicked).
    #[error("session expired: refresh exchange was interrupted")]
    Interrupted,
}

impl From<AuthError> for RefreshError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected { status, message } => {
                RefreshError::Rejected { status, message }
            }
            AuthError::Transport(e) => RefreshError::Unreachable(e.to_string()),
            AuthError::Protocol(e) => {
                RefreshError::InvalidResponse(e.to_string())
            }
        }
    }
}

/// Failure of a request sent through the
/// [`RequestPipeline`](crate::RequestPipeline).
///
/// Every status other than an unrecoverable 401 is returned as a normal
/// `Ok(ApiResponse)`; callers decide what a 404 or 500 means to them.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The request was rejected with 401 and recovery was impossible or
    /// already spent. Carries the 401 response the caller would have seen
    /// without the pipeline.
    #[error("authorization failed ({})", .0.status)]
    AuthorizationFailed(ApiResponse),

    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RequestError {
    /// `true` for [`RequestError::AuthorizationFailed`].
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, RequestError::AuthorizationFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_maps_to_refresh_error() {
        let rejected = AuthError::Rejected {
            status: 401,
            message: "Refresh token has expired".into(),
        };
        assert_eq!(
            RefreshError::from(rejected),
            RefreshError::Rejected {
                status: 401,
                message: "Refresh token has expired".into()
            }
        );

        let unreachable = AuthError::Transport(TransportError::request(
            std::io::Error::other("connection refused"),
        ));
        assert!(matches!(
            RefreshError::from(unreachable),
            RefreshError::Unreachable(msg) if msg.contains("connection refused")
        ));
    }

    #[test]
    fn test_refresh_error_display_says_session_expired() {
        let err = RefreshError::Unreachable("timeout".into());
        assert!(err.to_string().starts_with("session expired"));
        assert_eq!(
            RefreshError::NoRefreshCredential.to_string(),
            "no session to refresh"
        );
    }

    #[test]
    fn test_request_error_authorization_failed_display() {
        let err = RequestError::AuthorizationFailed(ApiResponse::new(401, ""));
        assert!(err.is_authorization_failure());
        assert_eq!(err.to_string(), "authorization failed (401)");
    }
}
