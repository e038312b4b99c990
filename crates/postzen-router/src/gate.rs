//! The navigation gate: decides, per transition, whether a destination
//! may be entered.

use std::sync::Arc;

use postzen_session::{CredentialStore, Storage};

use crate::{Location, RouterConfig};

/// Where a refused navigation is sent instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Name of the target route.
    pub name: String,
    pub query: Vec<(String, String)>,
}

/// Outcome of evaluating one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect(Redirect),
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }
}

/// Evaluates route access against the credential store.
///
/// The checks run in a fixed order:
///
/// 1. wait for the store's one-time restore (the only suspension point)
/// 2. protected route and anonymous: redirect to login, carrying the
///    requested full path
/// 3. guest-only route and signed in: redirect to the landing route
/// 4. otherwise allow
pub struct NavigationGate<S: Storage> {
    store: Arc<CredentialStore<S>>,
    config: RouterConfig,
}

impl<S: Storage> NavigationGate<S> {
    pub fn new(store: Arc<CredentialStore<S>>) -> Self {
        Self::with_config(store, RouterConfig::default())
    }

    pub fn with_config(store: Arc<CredentialStore<S>>, config: RouterConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<CredentialStore<S>> {
        &self.store
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Decides whether `to` may be entered. Never fails.
    pub async fn evaluate(&self, to: &Location) -> NavigationDecision {
        if !self.store.is_initialized() {
            tracing::debug!(to = %to.full_path, "waiting for session restore");
        }
        self.store.restore().await;
        self.decide(to, self.store.is_authenticated())
    }

    /// Steps 2 to 4 for a known authentication state.
    pub fn decide(&self, to: &Location, authenticated: bool) -> NavigationDecision {
        if to.meta.requires_auth && !authenticated {
            tracing::debug!(to = %to.full_path, "protected route, redirecting to login");
            return NavigationDecision::Redirect(Redirect {
                name: self.config.login_route.clone(),
                query: vec![(
                    self.config.redirect_query_key.clone(),
                    to.full_path.clone(),
                )],
            });
        }

        if to.meta.guest && authenticated {
            tracing::debug!(to = %to.full_path, "guest-only route, redirecting to landing");
            return NavigationDecision::Redirect(Redirect {
                name: self.config.landing_route.clone(),
                query: Vec::new(),
            });
        }

        NavigationDecision::Allow
    }
}
