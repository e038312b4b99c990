//! The remote auth endpoint.
//!
//! [`AuthEndpoint`] is the seam between session logic and the network:
//! the refresh coordinator and the login/logout flows only ever talk to
//! this trait. [`HttpAuthEndpoint`] is the real implementation; tests
//! substitute their own.
//!
//! Auth calls go straight to the transport, never through the
//! [`RequestPipeline`](crate::RequestPipeline): a 401 from `/auth/login`
//! means bad credentials, not an expired token, and must not trigger a
//! refresh.

use std::sync::Arc;

use postzen_protocol::{
    AuthResponse, Codec, ForgotPasswordRequest, JsonCodec, LoginRequest,
    MessageResponse, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest,
};
use postzen_transport::{ApiRequest, HttpTransport};
use serde::{Serialize, de::DeserializeOwned};

use crate::{AuthError, error_message, json_request};

/// The `/auth/*` operations of the PostZen API.
pub trait AuthEndpoint: Send + Sync + 'static {
    /// Exchanges email and password for a session.
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, AuthError>> + Send;

    /// Creates an account and signs it in.
    fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, AuthError>> + Send;

    /// Revokes the refresh token server-side.
    fn logout(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<MessageResponse, AuthError>> + Send;

    /// Exchanges a refresh token for a new session. The old refresh token
    /// is revoked by the server on success.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<AuthResponse, AuthError>> + Send;

    /// Asks the server to email a password reset link.
    fn forgot_password(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<MessageResponse, AuthError>> + Send;

    /// Sets a new password using the token from the reset email.
    fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<MessageResponse, AuthError>> + Send;
}

impl<E: AuthEndpoint> AuthEndpoint for Arc<E> {
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, AuthError>> + Send {
        (**self).login(email, password)
    }

    fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, AuthError>> + Send {
        (**self).register(email, username, password)
    }

    fn logout(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<MessageResponse, AuthError>> + Send {
        (**self).logout(refresh_token)
    }

    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<AuthResponse, AuthError>> + Send {
        (**self).refresh(refresh_token)
    }

    fn forgot_password(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<MessageResponse, AuthError>> + Send {
        (**self).forgot_password(email)
    }

    fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<MessageResponse, AuthError>> + Send {
        (**self).reset_password(token, new_password)
    }
}

// ---------------------------------------------------------------------------
// HttpAuthEndpoint
// ---------------------------------------------------------------------------

/// [`AuthEndpoint`] that posts JSON to `/auth/*` through a transport.
pub struct HttpAuthEndpoint<T: HttpTransport, C: Codec = JsonCodec> {
    transport: T,
    codec: C,
}

impl<T: HttpTransport> HttpAuthEndpoint<T> {
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, JsonCodec)
    }
}

impl<T: HttpTransport, C: Codec> HttpAuthEndpoint<T, C> {
    pub fn with_codec(transport: T, codec: C) -> Self {
        Self { transport, codec }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = json_request(&self.codec, ApiRequest::post(path), body)?;
        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            let message = error_message(&self.codec, &response);
            tracing::debug!(path, status = response.status, %message, "auth request rejected");
            return Err(AuthError::Rejected {
                status: response.status,
                message,
            });
        }

        Ok(self.codec.decode(&response.body)?)
    }

    async fn post_session<B>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthResponse, AuthError>
    where
        B: Serialize + Sync,
    {
        let session: AuthResponse = self.post(path, body).await?;
        session.validate()?;
        Ok(session)
    }
}

impl<T: HttpTransport, C: Codec> AuthEndpoint for HttpAuthEndpoint<T, C> {
    async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_session("/auth/login", &body).await
    }

    async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        let body = RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post_session("/auth/register", &body).await
    }

    async fn logout(
        &self,
        refresh_token: &str,
    ) -> Result<MessageResponse, AuthError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post("/auth/logout", &body).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<AuthResponse, AuthError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post_session("/auth/refresh", &body).await
    }

    async fn forgot_password(
        &self,
        email: &str,
    ) -> Result<MessageResponse, AuthError> {
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.post("/auth/forgot-password", &body).await
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<MessageResponse, AuthError> {
        let body = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.post("/auth/reset-password", &body).await
    }
}
