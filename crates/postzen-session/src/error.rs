//! Error types for the session layer.

/// Errors raised by a [`Storage`](crate::Storage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed (disk full,
    /// permissions, quota).
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing medium holds data that cannot be parsed.
    #[error("storage is corrupt: {0}")]
    Corrupt(String),
}

/// Errors that can occur while loading or saving the session.
///
/// The [`CredentialStore`](crate::CredentialStore) never surfaces these to
/// its callers: they are logged and the session falls back to anonymous.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A persisted session exists but is unreadable: an empty token or a
    /// user record that does not decode.
    #[error("persisted session is corrupt: {0}")]
    StorageCorrupt(String),
}
