//! # PostZen
//!
//! Session-managing API client for the PostZen blogging platform.
//!
//! A [`Client`] keeps the signed-in session across runs, attaches the
//! bearer token to every request, refreshes an expired token
//! transparently (once, however many requests hit the 401 together) and
//! gates navigation to protected routes until the persisted session has
//! been restored.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use postzen::prelude::*;
//!
//! # async fn example() -> Result<(), PostzenError> {
//! postzen::logging::init(false);
//!
//! let client = Client::builder()
//!     .base_url("http://localhost:8080/api")
//!     .build()?;
//!
//! match client.router().navigate("/write").await? {
//!     NavigationOutcome::Completed(at) if at.name == "login" => {
//!         client.auth().login("ana@postzen.dev", "secret").await?;
//!         client.router().continue_after_login().await?;
//!     }
//!     _ => {}
//! }
//! # Ok(())
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod client;
mod error;
pub mod logging;

pub use auth::AuthSession;
pub use client::{Client, ClientAuth, ClientBuilder};
pub use error::PostzenError;

pub use postzen_client as pipeline;
pub use postzen_protocol as protocol;
pub use postzen_router as router;
pub use postzen_session as session;
pub use postzen_transport as transport;

/// The types most applications need.
pub mod prelude {
    pub use crate::{AuthSession, Client, ClientBuilder, PostzenError};
    pub use postzen_client::{AuthEndpoint, HttpAuthEndpoint, RefreshError, RequestError};
    pub use postzen_protocol::{AuthResponse, Role, User};
    pub use postzen_router::{
        Location, NavigationOutcome, Route, RouteTable, Router, RouterConfig,
    };
    pub use postzen_session::{
        CredentialStore, JsonFileStorage, MemoryStorage, Session, Storage,
        StorageKeys,
    };
    pub use postzen_transport::{
        ApiRequest, ApiResponse, HttpTransport, ReqwestTransport,
    };
}
