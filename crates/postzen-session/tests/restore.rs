//! Integration tests for the one-time restore barrier.
//!
//! The storage used here is slow on purpose (a paused-clock sleep on every
//! read), so concurrent callers really do arrive while the first restore
//! is still suspended.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use postzen_protocol::{Role, User};
use postzen_session::{
    CredentialStore, JsonFileStorage, MemoryStorage, Storage, StorageError,
};

// =========================================================================
// Helpers
// =========================================================================

/// Counts reads per key and sleeps on each one.
#[derive(Default)]
struct SlowCountingStorage {
    inner: MemoryStorage,
    reads: std::sync::Mutex<HashMap<String, usize>>,
    total_reads: AtomicUsize,
}

impl SlowCountingStorage {
    fn reads_of(&self, key: &str) -> usize {
        self.reads
            .lock()
            .expect("poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

impl Storage for SlowCountingStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.total_reads.fetch_add(1, Ordering::SeqCst);
        *self
            .reads
            .lock()
            .expect("poisoned")
            .entry(key.to_string())
            .or_default() += 1;
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

fn editor() -> User {
    User {
        id: 9,
        username: "editor".into(),
        email: "editor@postzen.dev".into(),
        role: Role::Admin,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_restore_reads_storage_once() {
    let storage = SlowCountingStorage::default();
    storage.set("accessToken", "a0").await.unwrap();
    storage.set("refreshToken", "r0").await.unwrap();
    storage
        .set("user", &serde_json::to_string(&editor()).unwrap())
        .await
        .unwrap();
    let store = Arc::new(CredentialStore::new(storage));

    let callers = (0..8).map(|_| {
        let store = Arc::clone(&store);
        async move {
            store.restore().await;
            // Every caller sees the finished restore, not a partial one.
            (store.is_initialized(), store.is_authenticated())
        }
    });
    let results = join_all(callers).await;

    assert!(results.iter().all(|&(init, auth)| init && auth));
    let storage = store.storage();
    assert_eq!(storage.total_reads.load(Ordering::SeqCst), 3);
    for key in ["accessToken", "refreshToken", "user"] {
        assert_eq!(storage.reads_of(key), 1, "{key} read more than once");
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_restore_from_spawned_tasks() {
    let store = Arc::new(CredentialStore::new(SlowCountingStorage::default()));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.restore().await })
        })
        .collect();
    for h in handles {
        h.await.expect("task should complete");
    }

    assert!(store.is_initialized());
    assert!(!store.is_authenticated());
    assert_eq!(store.storage().total_reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_set_session_round_trips_user_through_restore() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = CredentialStore::new(JsonFileStorage::new(&path));
    first.restore().await;
    first.set_session("a1", "r1", editor()).await;
    assert!(first.is_admin());

    // A fresh process: new store, same file. Twice, to show the record
    // survives repeated restores unchanged.
    for _ in 0..2 {
        let next = CredentialStore::new(JsonFileStorage::new(&path));
        next.restore().await;
        assert!(next.is_authenticated());
        assert!(next.is_admin());
        assert_eq!(next.user(), Some(editor()));
        assert_eq!(next.access_token().as_deref(), Some("a1"));
        assert_eq!(next.refresh_token().as_deref(), Some("r1"));
    }
}

#[tokio::test]
async fn test_clear_leaves_no_session_keys_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = CredentialStore::new(JsonFileStorage::new(&path));
    store.set_session("a1", "r1", editor()).await;

    store.clear().await;

    let reopened = JsonFileStorage::new(&path);
    for key in ["accessToken", "refreshToken", "user"] {
        assert_eq!(reopened.get(key).await.unwrap(), None);
    }
    let next = CredentialStore::new(reopened);
    next.restore().await;
    assert!(!next.is_authenticated());
}
