//! The authenticated request pipeline.
//!
//! Every resource call goes through four stages:
//!
//! 1. **inject-credential**: attach `Authorization: Bearer <token>` when
//!    the store holds an access token.
//! 2. **detect-401**: any other status, and any transport failure, goes
//!    back to the caller untouched.
//! 3. **coordinate-refresh**: join (or start) the single refresh exchange.
//! 4. **replay-once**: resend with the new token. A request is replayed
//!    at most once; a second 401 is final.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use postzen_session::{CredentialStore, Storage};
use postzen_transport::{
    AUTHORIZATION, ApiRequest, ApiResponse, HttpTransport, RequestId,
};

use crate::{AuthEndpoint, RefreshCoordinator, RequestError};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// PendingRequest
// ---------------------------------------------------------------------------

/// A request travelling through the pipeline, with its retry marker.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    id: RequestId,
    request: ApiRequest,
    retried: bool,
}

impl PendingRequest {
    /// Wraps `request` with a fresh id. Not yet retried.
    pub fn new(request: ApiRequest) -> Self {
        let id = RequestId::new(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            request,
            retried: false,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn into_request(self) -> ApiRequest {
        self.request
    }

    /// `true` once the request has been replayed after a 401.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Attaches `token` as the bearer credential, replacing any previous
    /// one. `None` leaves the request as it is.
    pub fn inject_credential(&mut self, token: Option<&str>) {
        if let Some(token) = token {
            self.request
                .set_header(AUTHORIZATION, format!("Bearer {token}"));
        }
    }

    /// The bearer credential currently attached.
    pub fn credential(&self) -> Option<&str> {
        self.request.bearer_token()
    }
}

// ---------------------------------------------------------------------------
// RequestPipeline
// ---------------------------------------------------------------------------

/// Sends resource requests with the current credential and recovers from
/// an expired access token transparently.
pub struct RequestPipeline<S: Storage, A: AuthEndpoint, T: HttpTransport> {
    transport: T,
    coordinator: Arc<RefreshCoordinator<S, A>>,
}

impl<S, A, T> RequestPipeline<S, A, T>
where
    S: Storage,
    A: AuthEndpoint,
    T: HttpTransport,
{
    pub fn new(transport: T, coordinator: Arc<RefreshCoordinator<S, A>>) -> Self {
        Self {
            transport,
            coordinator,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore<S>> {
        self.coordinator.store()
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator<S, A>> {
        &self.coordinator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` through all stages.
    ///
    /// Returns the server's response for every status except a 401 that
    /// could not be recovered, which becomes
    /// [`RequestError::AuthorizationFailed`]. In that case the session has
    /// been cleared.
    pub async fn send(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, RequestError> {
        // The persisted session must be in place before the first token
        // read; after the first call this returns immediately.
        self.store().restore().await;

        let mut pending = PendingRequest::new(request);
        pending.inject_credential(self.store().access_token().as_deref());

        let response = self.dispatch(&pending).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }
        self.recover(pending, response).await
    }

    /// Stages 3 and 4 for a request that just received `unauthorized`.
    pub async fn recover(
        &self,
        mut pending: PendingRequest,
        unauthorized: ApiResponse,
    ) -> Result<ApiResponse, RequestError> {
        if pending.is_retried() {
            tracing::debug!(request_id = %pending.id(), "401 after replay, giving up");
            return Err(RequestError::AuthorizationFailed(unauthorized));
        }
        pending.mark_retried();

        let store = self.store();
        let sent_with = pending.credential().map(str::to_string);

        let token = match store.access_token() {
            // A refresh settled after this request was sent: its token is
            // newer than the one that was rejected.
            Some(current) if Some(&current) != sent_with.as_ref() => {
                tracing::debug!(
                    request_id = %pending.id(),
                    "credential changed since send, replaying"
                );
                current
            }
            _ if store.refresh_token().is_none() => {
                tracing::debug!(
                    request_id = %pending.id(),
                    "401 with no refresh token"
                );
                if sent_with.is_some() {
                    store
                        .clear_if(|s| s.access_token() == sent_with.as_deref())
                        .await;
                }
                return Err(RequestError::AuthorizationFailed(unauthorized));
            }
            _ => match self.coordinator.refresh().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::debug!(
                        request_id = %pending.id(),
                        error = %e,
                        "refresh failed, returning original 401"
                    );
                    return Err(RequestError::AuthorizationFailed(unauthorized));
                }
            },
        };

        pending.inject_credential(Some(&token));
        let replay = self.dispatch(&pending).await?;

        if replay.is_unauthorized() {
            tracing::warn!(
                request_id = %pending.id(),
                path = %pending.request().path,
                "401 after refresh, clearing session"
            );
            store
                .clear_if(|s| s.access_token() == Some(token.as_str()))
                .await;
            return Err(RequestError::AuthorizationFailed(replay));
        }
        Ok(replay)
    }

    async fn dispatch(
        &self,
        pending: &PendingRequest,
    ) -> Result<ApiResponse, RequestError> {
        let request = pending.request();
        let response = self.transport.send(request).await.map_err(|e| {
            tracing::debug!(
                request_id = %pending.id(),
                path = %request.path,
                error = %e,
                "request failed"
            );
            e
        })?;
        tracing::debug!(
            request_id = %pending.id(),
            method = %request.method,
            path = %request.path,
            status = response.status,
            retried = pending.is_retried(),
            "response received"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_request_ids_are_unique() {
        let a = PendingRequest::new(ApiRequest::get("/posts"));
        let b = PendingRequest::new(ApiRequest::get("/posts"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_inject_credential_sets_and_replaces_bearer() {
        let mut pending = PendingRequest::new(ApiRequest::get("/posts/mine"));
        assert_eq!(pending.credential(), None);

        pending.inject_credential(Some("a0"));
        assert_eq!(pending.credential(), Some("a0"));

        pending.inject_credential(Some("a1"));
        assert_eq!(pending.credential(), Some("a1"));
        assert_eq!(pending.request().headers.len(), 1);
    }

    #[test]
    fn test_inject_credential_none_leaves_request_untouched() {
        let mut pending = PendingRequest::new(ApiRequest::get("/posts"));
        pending.inject_credential(None);
        assert!(pending.request().headers.is_empty());
    }

    #[test]
    fn test_mark_retried_is_sticky() {
        let mut pending = PendingRequest::new(ApiRequest::get("/posts"));
        assert!(!pending.is_retried());
        pending.mark_retried();
        pending.mark_retried();
        assert!(pending.is_retried());
        let id = pending.id();
        assert_eq!(pending.clone().id(), id);
    }
}
