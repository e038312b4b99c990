//! Route table and session-aware navigation for PostZen.
//!
//! Every navigation passes through the [`NavigationGate`] before it is
//! committed: the gate waits for the persisted session to be restored,
//! then redirects anonymous visitors away from protected routes and
//! signed-in users away from guest-only ones.
//!
//! # Key types
//!
//! - [`RouteTable`]: named routes with `:param` segments and a catch-all
//! - [`Location`]: a resolved path: route, params, query
//! - [`NavigationGate`]: the per-transition guard
//! - [`Router`]: drives navigations, follows redirects, drops superseded
//!   ones
//! - [`RouterConfig`]: names of the login and landing routes

mod config;
mod error;
mod gate;
mod route;
mod router;

pub use config::RouterConfig;
pub use error::RouterError;
pub use gate::{NavigationDecision, NavigationGate, Redirect};
pub use route::{Location, Route, RouteMeta, RouteTable};
pub use router::{NavigationOutcome, Router};
