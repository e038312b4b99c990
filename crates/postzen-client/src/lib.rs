//! Authenticated request pipeline for the PostZen client.
//!
//! This crate sits between the transport and the application and owns the
//! two recovery mechanisms that make an expiring access token invisible
//! to callers:
//!
//! - **Auth endpoint** ([`AuthEndpoint`], [`HttpAuthEndpoint`]): the
//!   remote `/auth/*` operations: login, register, logout, refresh,
//!   password reset.
//! - **Refresh coordinator** ([`RefreshCoordinator`]): exchanges the
//!   refresh token for a new session, coalescing concurrent callers into a
//!   single exchange.
//! - **Request pipeline** ([`RequestPipeline`]): attaches the bearer
//!   credential to every request and, on a 401, refreshes once and
//!   replays the request once.
//!
//! ```text
//! caller ──→ RequestPipeline ──→ HttpTransport ──→ server
//!                 │  401
//!                 ▼
//!         RefreshCoordinator ──→ AuthEndpoint::refresh
//!                 │
//!                 ▼
//!          CredentialStore (set_session / clear)
//! ```

#![allow(async_fn_in_trait)]

mod endpoint;
mod envelope;
mod error;
mod pipeline;
mod refresh;

pub use endpoint::{AuthEndpoint, HttpAuthEndpoint};
pub use envelope::{error_message, json_request};
pub use error::{AuthError, RefreshError, RequestError};
pub use pipeline::{PendingRequest, RequestPipeline};
pub use refresh::RefreshCoordinator;
