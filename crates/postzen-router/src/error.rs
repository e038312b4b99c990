//! Error types for the routing layer.

/// Errors that can occur while resolving or performing a navigation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// No route is registered under this name.
    #[error("no route named {0:?}")]
    UnknownRoute(String),

    /// No route pattern matches the path. Tables with a catch-all route
    /// never produce this.
    #[error("no route matches {0:?}")]
    NoMatch(String),

    /// A named route was built without one of its `:param` values.
    #[error("route {route:?} needs parameter {param:?}")]
    MissingParam { route: String, param: String },

    /// Guards kept redirecting without settling on a destination.
    #[error("navigation to {0:?} redirected too many times")]
    RedirectLoop(String),
}
