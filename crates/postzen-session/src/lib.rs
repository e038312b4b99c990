//! Session state for the PostZen client.
//!
//! This crate owns everything the client knows about who is signed in:
//!
//! 1. **Persistence**: a key-value [`Storage`] the session is saved to and
//!    restored from ([`MemoryStorage`], [`JsonFileStorage`])
//! 2. **Session**: the authenticated-or-anonymous snapshot ([`Session`])
//! 3. **Credential store**: the single owner of the live session
//!    ([`CredentialStore`]): one-time restore, atomic set/clear, derived
//!    reads
//!
//! # How it fits in the stack
//!
//! ```text
//! Client / Router (above)  ← read the session, gate navigation, replay requests
//!     ↕
//! Session Layer (this crate)  ← owns access token, refresh token, user
//!     ↕
//! Protocol Layer (below)  ← provides User, Role
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod session;
mod storage;
mod store;

pub use error::{SessionError, StorageError};
pub use session::{Session, StorageKeys};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::CredentialStore;
