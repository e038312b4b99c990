//! The credential store: single owner of the live session.
//!
//! Every component reads the session through this store and nothing else
//! keeps a copy, so all of them observe the latest value:
//! - the request pipeline reads the access token before each send
//! - the refresh coordinator writes the session after an exchange
//! - the navigation gate waits for [`restore`](CredentialStore::restore)
//!   and then reads `is_authenticated`
//!
//! # Concurrency
//!
//! The live session sits in a `tokio::sync::watch` channel. Writers
//! replace the whole [`Session`] value at once, so a reader can never
//! observe a new access token paired with a stale user. Writers
//! (`set_session`, `clear`, and the install step of `restore`) are
//! serialized by an async mutex so their persistence writes never
//! interleave.

use std::sync::atomic::{AtomicBool, Ordering};

use postzen_protocol::{Codec, JsonCodec, User};
use tokio::sync::{Mutex, OnceCell, watch};

use crate::{Session, SessionError, Storage, StorageKeys};

/// Owns the session, persists it, and restores it once per process.
pub struct CredentialStore<S: Storage> {
    storage: S,
    keys: StorageKeys,

    /// Current session. Readers borrow snapshots; writers `send_replace`.
    state: watch::Sender<Session>,

    /// Completed once the one-time restore has run. Concurrent callers of
    /// `restore` all wait on the same initialization.
    restored: OnceCell<()>,

    /// Serializes writers.
    write_lock: Mutex<()>,

    /// Set by the first `set_session`/`clear`. A restore that finishes
    /// after a write must not overwrite it with older persisted data.
    written: AtomicBool,
}

impl<S: Storage> CredentialStore<S> {
    /// Creates an anonymous, not yet restored store with the default keys.
    pub fn new(storage: S) -> Self {
        Self::with_keys(storage, StorageKeys::default())
    }

    pub fn with_keys(storage: S, keys: StorageKeys) -> Self {
        let (state, _) = watch::channel(Session::Anonymous);
        Self {
            storage,
            keys,
            state,
            restored: OnceCell::new(),
            write_lock: Mutex::new(()),
            written: AtomicBool::new(false),
        }
    }

    /// Restores the persisted session, exactly once per store.
    ///
    /// The first call reads the access token, refresh token and user
    /// record; if both the access token and a readable user are present,
    /// they become the current session. Later calls return immediately,
    /// and calls made while the first is still running wait for it.
    ///
    /// Never fails: unreadable storage or a corrupt record leaves the
    /// session anonymous (the corrupt keys are removed).
    pub async fn restore(&self) {
        self.restored
            .get_or_init(|| async {
                let loaded = self.load_persisted().await;

                let _guard = self.write_lock.lock().await;
                if self.written.load(Ordering::Acquire) {
                    tracing::debug!(
                        "session written before restore finished, keeping it"
                    );
                    return;
                }

                match loaded {
                    Ok(Some(session)) => {
                        if let Some(user) = session.user() {
                            tracing::info!(
                                user_id = user.id,
                                username = %user.username,
                                "session restored"
                            );
                        }
                        self.state.send_replace(session);
                    }
                    Ok(None) => {
                        tracing::debug!("no persisted session, starting anonymous");
                    }
                    Err(SessionError::StorageCorrupt(reason)) => {
                        tracing::warn!(
                            %reason,
                            "persisted session is corrupt, starting anonymous"
                        );
                        self.remove_persisted().await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "could not read persisted session, starting anonymous"
                        );
                    }
                }
            })
            .await;
    }

    /// Reads the three persisted keys.
    ///
    /// Returns `Ok(None)` when there is no complete session (no access
    /// token or no user record).
    async fn load_persisted(&self) -> Result<Option<Session>, SessionError> {
        let access = self.storage.get(&self.keys.access_token).await?;
        let refresh = self.storage.get(&self.keys.refresh_token).await?;
        let user = self.storage.get(&self.keys.user).await?;

        let (Some(access), Some(user)) = (access, user) else {
            return Ok(None);
        };
        if access.is_empty() {
            return Err(SessionError::StorageCorrupt(
                "empty access token".into(),
            ));
        }
        let user: User = JsonCodec
            .decode(user.as_bytes())
            .map_err(|e| SessionError::StorageCorrupt(e.to_string()))?;
        let refresh = refresh.filter(|r| !r.is_empty());

        Ok(Some(Session::authenticated(access, refresh, user)))
    }

    /// Replaces the whole session and persists it.
    ///
    /// Readers see the new access token, refresh token and user together.
    /// Persistence failures are logged; the in-memory session still
    /// changes, and any partially written keys are removed so a later
    /// restore can't pair them with stale ones.
    pub async fn set_session(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: User,
    ) {
        self.replace_if(|_| true, access_token, refresh_token, user)
            .await;
    }

    /// Like [`set_session`](Self::set_session), but only if `predicate`
    /// holds for the current session, checked under the writer lock.
    ///
    /// Returns whether the session was replaced. Used by token refresh so
    /// an exchange that settles after a logout or a new login does not
    /// overwrite the newer state.
    pub async fn replace_if(
        &self,
        predicate: impl FnOnce(&Session) -> bool + Send,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: User,
    ) -> bool {
        let session = Session::authenticated(
            access_token,
            Some(refresh_token.into()),
            user,
        );

        let _guard = self.write_lock.lock().await;
        let allowed = predicate(&self.state.borrow());
        if !allowed {
            return false;
        }
        self.written.store(true, Ordering::Release);
        self.state.send_replace(session.clone());

        if let Some(user) = session.user() {
            tracing::info!(user_id = user.id, "session installed");
        }

        if let Err(e) = self.persist(&session).await {
            tracing::warn!(error = %e, "failed to persist session");
            self.remove_persisted().await;
        }
        true
    }

    async fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let Session::Authenticated {
            access_token,
            refresh_token,
            user,
        } = session
        else {
            return Ok(());
        };

        let user = JsonCodec
            .encode(user)
            .map_err(|e| SessionError::StorageCorrupt(e.to_string()))?;
        let user = String::from_utf8_lossy(&user);

        self.storage.set(&self.keys.user, &user).await?;
        match refresh_token {
            Some(refresh) => {
                self.storage.set(&self.keys.refresh_token, refresh).await?
            }
            None => self.storage.remove(&self.keys.refresh_token).await?,
        }
        self.storage.set(&self.keys.access_token, access_token).await?;
        Ok(())
    }

    /// Drops the session from memory and from storage. Idempotent.
    pub async fn clear(&self) {
        self.clear_if(|_| true).await;
    }

    /// Clears only if `predicate` holds for the current session, checked
    /// under the writer lock. Returns whether anything was cleared.
    pub async fn clear_if(
        &self,
        predicate: impl FnOnce(&Session) -> bool + Send,
    ) -> bool {
        let _guard = self.write_lock.lock().await;
        let allowed = predicate(&self.state.borrow());
        if !allowed {
            return false;
        }
        self.written.store(true, Ordering::Release);
        let previous = self.state.send_replace(Session::Anonymous);

        if let Some(user) = previous.user() {
            tracing::info!(user_id = user.id, "session cleared");
        }

        self.remove_persisted().await;
        true
    }

    /// Best-effort removal of all three keys. Caller holds the write lock
    /// or is the one-time restore.
    async fn remove_persisted(&self) {
        for key in self.keys.all() {
            if let Err(e) = self.storage.remove(key).await {
                tracing::warn!(key, error = %e, "failed to remove persisted key");
            }
        }
    }

    // -- Reads ------------------------------------------------------------

    /// `true` once [`restore`](Self::restore) has completed.
    pub fn is_initialized(&self) -> bool {
        self.restored.initialized()
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token().map(str::to_string)
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Subscribes to session changes. The receiver starts at the current
    /// value and is notified on every `set_session`, `clear` and restore.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// The underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }
}

// =========================================================================
// Tests
// =========================================================================
