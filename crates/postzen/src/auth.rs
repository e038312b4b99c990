//! The auth facade: sign-in, sign-out and account recovery on top of the
//! credential store.

use std::sync::Arc;

use postzen_client::{AuthEndpoint, RefreshCoordinator};
use postzen_protocol::{AuthResponse, User};
use postzen_session::{CredentialStore, Session, Storage};
use tokio::sync::watch;

use crate::PostzenError;

/// User-facing auth actions.
///
/// Successful login and register install the returned session in the
/// store; logout always ends the local session, whatever the server says.
pub struct AuthSession<S: Storage, A: AuthEndpoint> {
    coordinator: Arc<RefreshCoordinator<S, A>>,
}

impl<S: Storage, A: AuthEndpoint> AuthSession<S, A> {
    pub fn new(coordinator: Arc<RefreshCoordinator<S, A>>) -> Self {
        Self { coordinator }
    }

    pub fn store(&self) -> &Arc<CredentialStore<S>> {
        self.coordinator.store()
    }

    fn endpoint(&self) -> &A {
        self.coordinator.auth()
    }

    /// Loads the persisted session. Runs once; later calls return at once.
    pub async fn restore(&self) {
        self.store().restore().await;
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, PostzenError> {
        let response = self.endpoint().login(email, password).await?;
        Ok(self.install(response).await)
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<User, PostzenError> {
        let response =
            self.endpoint().register(email, username, password).await?;
        Ok(self.install(response).await)
    }

    async fn install(&self, response: AuthResponse) -> User {
        let AuthResponse {
            access_token,
            refresh_token,
            user,
            ..
        } = response;
        self.store()
            .set_session(access_token, refresh_token, user.clone())
            .await;
        user
    }

    /// Clears the local session, then revokes the captured refresh token
    /// server-side (best effort).
    ///
    /// Clearing first means an exchange still in flight finds the session
    /// gone and never installs its rotated tokens. That rotated refresh
    /// token is not revoked here; the server expires it.
    pub async fn logout(&self) {
        let refresh_token = self.store().refresh_token();
        self.store().clear().await;

        if let Some(refresh_token) = refresh_token {
            if let Err(e) = self.endpoint().logout(&refresh_token).await {
                tracing::warn!(error = %e, "logout request failed, local session already cleared");
            }
        }
    }

    /// Exchanges the refresh token now, sharing any exchange already in
    /// flight. Returns the new access token.
    pub async fn refresh_access_token(&self) -> Result<String, PostzenError> {
        Ok(self.coordinator.refresh().await?)
    }

    /// Requests a password reset email. Returns the server's message.
    pub async fn forgot_password(&self, email: &str) -> Result<String, PostzenError> {
        Ok(self.endpoint().forgot_password(email).await?.message)
    }

    /// Sets a new password with the token from the reset email.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, PostzenError> {
        Ok(self
            .endpoint()
            .reset_password(token, new_password)
            .await?
            .message)
    }

    // -- Reads ------------------------------------------------------------

    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.store().is_admin()
    }

    pub fn user(&self) -> Option<User> {
        self.store().user()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store().access_token()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store().subscribe()
    }
}
