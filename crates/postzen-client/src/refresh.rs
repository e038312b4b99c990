//! Single-flight token refresh.
//!
//! Several requests can hit a 401 at the same moment (the access token
//! expired for all of them). Only one of them may exchange the refresh
//! token: the server rotates it, so a second exchange with the old one
//! would be rejected and log the user out. [`RefreshCoordinator`] keeps
//! at most one exchange outstanding and hands its single outcome to every
//! caller that asked while it ran.
//!
//! The exchange runs on its own task. Dropping every caller does not
//! cancel it, so the store is always left either with the rotated session
//! or cleared.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use postzen_session::{CredentialStore, Storage};
use tokio::sync::{Notify, OnceCell};

use crate::{AuthEndpoint, RefreshError};

/// Outcome shared by every caller of one exchange: the new access token.
type RefreshOutcome = Result<String, RefreshError>;

// ---------------------------------------------------------------------------
// InFlightRefresh
// ---------------------------------------------------------------------------

/// One outstanding exchange. Set exactly once, then every waiter wakes.
struct InFlightRefresh {
    result: OnceCell<RefreshOutcome>,
    notify: Notify,
}

impl InFlightRefresh {
    fn new() -> Self {
        Self {
            result: OnceCell::new(),
            notify: Notify::new(),
        }
    }

    fn set_result(&self, outcome: RefreshOutcome) {
        let _ = self.result.set(outcome);
        self.notify.notify_waiters();
    }

    async fn wait(&self) -> RefreshOutcome {
        loop {
            if let Some(outcome) = self.result.get() {
                return outcome.clone();
            }

            // Register before the second check so a set_result landing in
            // between is not missed.
            let notified = self.notify.notified();
            if let Some(outcome) = self.result.get() {
                return outcome.clone();
            }

            notified.await;
        }
    }
}

type Slot = Mutex<Option<Arc<InFlightRefresh>>>;

fn lock_slot(slot: &Slot) -> MutexGuard<'_, Option<Arc<InFlightRefresh>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Empties the slot (if it still holds `flight`) and resolves the waiters.
///
/// The slot is reset first: a waiter that wakes up and immediately needs
/// another refresh must start a new exchange, not rejoin the settled one.
fn settle(slot: &Slot, flight: &Arc<InFlightRefresh>, outcome: RefreshOutcome) {
    {
        let mut current = lock_slot(slot);
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, flight)) {
            current.take();
        }
    }
    flight.set_result(outcome);
}

/// Settles the exchange as [`RefreshError::Interrupted`] if the task
/// unwinds before reaching `finish`.
struct SettleGuard<'a> {
    slot: &'a Slot,
    flight: &'a Arc<InFlightRefresh>,
    settled: bool,
}

impl SettleGuard<'_> {
    fn finish(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        settle(self.slot, self.flight, outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("refresh exchange ended without settling");
            settle(self.slot, self.flight, Err(RefreshError::Interrupted));
        }
    }
}

// ---------------------------------------------------------------------------
// RefreshCoordinator
// ---------------------------------------------------------------------------

/// Exchanges the refresh token for a new session, one exchange at a time.
///
/// Shared behind an `Arc` by the request pipeline and the auth facade.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use postzen_client::{HttpAuthEndpoint, RefreshCoordinator};
/// use postzen_session::{CredentialStore, MemoryStorage};
/// use postzen_transport::ReqwestTransport;
///
/// # async fn example() {
/// let store = Arc::new(CredentialStore::new(MemoryStorage::new()));
/// let auth = HttpAuthEndpoint::new(ReqwestTransport::new("http://localhost:8080/api"));
/// let coordinator = Arc::new(RefreshCoordinator::new(store, auth));
///
/// match coordinator.refresh().await {
///     Ok(_token) => println!("session extended"),
///     Err(e) => println!("{e}"),
/// }
/// # }
/// ```
pub struct RefreshCoordinator<S: Storage, A: AuthEndpoint> {
    store: Arc<CredentialStore<S>>,
    auth: A,

    /// The outstanding exchange, if any.
    in_flight: Slot,

    /// Exchanges that reached the auth endpoint.
    exchanges: AtomicU64,
}

impl<S: Storage, A: AuthEndpoint> RefreshCoordinator<S, A> {
    pub fn new(store: Arc<CredentialStore<S>>, auth: A) -> Self {
        Self {
            store,
            auth,
            in_flight: Mutex::new(None),
            exchanges: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore<S>> {
        &self.store
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Number of exchanges sent to the auth endpoint so far.
    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// `true` while an exchange is outstanding.
    pub fn is_refreshing(&self) -> bool {
        lock_slot(&self.in_flight).is_some()
    }

    /// Returns a fresh access token, exchanging the refresh token if no
    /// exchange is already running, or joining the running one.
    ///
    /// On success the new session is already installed in the store when
    /// this returns. On failure the store has been cleared, unless the
    /// session changed during the exchange (a logout or a new login), in
    /// which case the newer session is left alone.
    pub async fn refresh(self: &Arc<Self>) -> Result<String, RefreshError> {
        let (flight, leader) = self.join_or_start();

        if leader {
            let this = Arc::clone(self);
            let task_flight = Arc::clone(&flight);
            tokio::spawn(async move {
                let guard = SettleGuard {
                    slot: &this.in_flight,
                    flight: &task_flight,
                    settled: false,
                };
                let outcome = this.exchange().await;
                guard.finish(outcome);
            });
        } else {
            tracing::debug!("joining in-flight token refresh");
        }

        flight.wait().await
    }

    fn join_or_start(&self) -> (Arc<InFlightRefresh>, bool) {
        let mut slot = lock_slot(&self.in_flight);
        if let Some(existing) = slot.as_ref() {
            return (Arc::clone(existing), false);
        }
        let flight = Arc::new(InFlightRefresh::new());
        *slot = Some(Arc::clone(&flight));
        (flight, true)
    }

    /// One exchange against the auth endpoint, applied to the store.
    async fn exchange(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::debug!("no refresh token, clearing session");
            self.store
                .clear_if(|current| current.refresh_token().is_none())
                .await;
            return Err(RefreshError::NoRefreshCredential);
        };

        let exchange = self.exchanges.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(exchange, "exchanging refresh token");

        let outcome = self
            .auth
            .refresh(&refresh_token)
            .await
            .map_err(RefreshError::from)
            .and_then(|session| {
                session
                    .validate()
                    .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
                Ok(session)
            });

        // Both branches only touch the store if it still holds the refresh
        // token that was exchanged.
        let still_current = |current: &postzen_session::Session| {
            current.refresh_token() == Some(refresh_token.as_str())
        };

        match outcome {
            Ok(session) => {
                let access_token = session.access_token.clone();
                let user_id = session.user.id;
                let installed = self
                    .store
                    .replace_if(
                        still_current,
                        session.access_token,
                        session.refresh_token,
                        session.user,
                    )
                    .await;
                if installed {
                    tracing::info!(exchange, user_id, "access token refreshed");
                    return Ok(access_token);
                }
                tracing::info!(
                    exchange,
                    "session changed during refresh, keeping the newer one"
                );
                self.store
                    .access_token()
                    .ok_or(RefreshError::NoRefreshCredential)
            }
            Err(err) => {
                tracing::warn!(exchange, error = %err, "token refresh failed");
                if self.store.clear_if(still_current).await {
                    tracing::info!(exchange, "session expired, cleared");
                }
                Err(err)
            }
        }
    }
}
