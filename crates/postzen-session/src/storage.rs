//! Key-value persistence for the session.
//!
//! The client doesn't care where the session lives between runs: a
//! browser's local storage, a file in the user's config directory, or a
//! plain map in tests. [`Storage`] is the whole contract: get, set,
//! remove. The [`CredentialStore`](crate::CredentialStore) is the only
//! reader and writer.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::StorageError;

/// A string key-value store.
///
/// # Example
///
/// ```rust
/// use postzen_session::{Storage, StorageError};
///
/// /// Forgets everything. Every client that uses it starts anonymous.
/// struct NullStorage;
///
/// impl Storage for NullStorage {
///     async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
///         Ok(None)
///     }
///
///     async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
///         Ok(())
///     }
///
///     async fn remove(&self, _key: &str) -> Result<(), StorageError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Storage: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` if there is none.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<T: Storage> Storage for Arc<T> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).set(key, value)
    }

    fn remove(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).remove(key)
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-filled with the given entries.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStorage
// ---------------------------------------------------------------------------

/// Storage backed by a single JSON object file (`{"key": "value", ...}`).
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves either the old or the new file. A
/// missing file reads as empty. A file that does not parse fails reads
/// with [`StorageError::Corrupt`]; the next write replaces it.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    /// Loads the map for a read-modify-write, discarding a corrupt file.
    async fn load_for_write(
        &self,
    ) -> Result<BTreeMap<String, String>, StorageError> {
        match self.load().await {
            Err(StorageError::Corrupt(reason)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %reason,
                    "replacing corrupt storage file"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    async fn save(
        &self,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_for_write().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_for_write().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // MemoryStorage
    // =====================================================================

    #[tokio::test]
    async fn test_memory_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").await.unwrap(), None);

        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));

        storage.remove("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_remove_missing_key_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.remove("nothing").await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_with_entries_prefills() {
        let storage = MemoryStorage::with_entries([("a", "1"), ("b", "2")]);
        assert_eq!(storage.len().await, 2);
        assert_eq!(storage.get("b").await.unwrap().as_deref(), Some("2"));
    }

    // =====================================================================
    // JsonFileStorage
    // =====================================================================

    #[tokio::test]
    async fn test_file_missing_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("session.json"));

        assert_eq!(storage.get("accessToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        JsonFileStorage::new(&path)
            .set("accessToken", "a1")
            .await
            .unwrap();

        let reopened = JsonFileStorage::new(&path);
        assert_eq!(
            reopened.get("accessToken").await.unwrap().as_deref(),
            Some("a1")
        );

        reopened.remove("accessToken").await.unwrap();
        assert_eq!(reopened.get("accessToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_corrupt_read_fails_and_write_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let storage = JsonFileStorage::new(&path);

        let read = storage.get("user").await;
        assert!(matches!(read, Err(StorageError::Corrupt(_))));

        storage.set("user", "{}").await.expect("write replaces file");
        assert_eq!(storage.get("user").await.unwrap().as_deref(), Some("{}"));
    }
}
