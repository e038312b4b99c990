//! Router: resolves targets, runs the gate, follows redirects and commits
//! the current location.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use postzen_session::{CredentialStore, Storage};
use tokio::sync::watch;

use crate::{
    Location, NavigationDecision, NavigationGate, RouteTable, RouterConfig,
    RouterError,
};

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The location was committed. If the gate redirected, this is the
    /// final destination and `redirected_from` names the original target.
    Completed(Location),

    /// A newer navigation started while this one was waiting on the gate.
    /// Nothing was committed.
    Superseded,
}

impl NavigationOutcome {
    pub fn location(&self) -> Option<&Location> {
        match self {
            NavigationOutcome::Completed(location) => Some(location),
            NavigationOutcome::Superseded => None,
        }
    }
}

/// Drives navigations through the [`NavigationGate`].
///
/// Only the most recent navigation may commit: each call takes a new
/// generation number and gives up if another call has taken a newer one
/// by the time the gate answers.
pub struct Router<S: Storage> {
    table: RouteTable,
    gate: NavigationGate<S>,
    generation: AtomicU64,
    current: watch::Sender<Option<Location>>,
}

impl<S: Storage> Router<S> {
    pub fn new(table: RouteTable, store: Arc<CredentialStore<S>>) -> Self {
        Self::with_config(table, store, RouterConfig::default())
    }

    pub fn with_config(
        table: RouteTable,
        store: Arc<CredentialStore<S>>,
        config: RouterConfig,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            table,
            gate: NavigationGate::with_config(store, config),
            generation: AtomicU64::new(0),
            current,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn gate(&self) -> &NavigationGate<S> {
        &self.gate
    }

    /// The last committed location, `None` before the first navigation.
    pub fn current(&self) -> Option<Location> {
        self.current.borrow().clone()
    }

    /// Subscribes to committed locations.
    pub fn subscribe(&self) -> watch::Receiver<Option<Location>> {
        self.current.subscribe()
    }

    /// Navigates to a path such as `/edit/7?draft=1`.
    pub async fn navigate(
        &self,
        full_path: &str,
    ) -> Result<NavigationOutcome, RouterError> {
        let generation = self.begin();
        let target = self.table.resolve(full_path)?;
        self.run(generation, target).await
    }

    /// Navigates to a named route.
    pub async fn navigate_named(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
        query: &[(String, String)],
    ) -> Result<NavigationOutcome, RouterError> {
        let generation = self.begin();
        let target = self.table.resolve_named(name, params, query)?;
        self.run(generation, target).await
    }

    /// Navigates to where a successful login should land: the return path
    /// carried by the current location, or the landing route.
    ///
    /// Only same-site paths are honored as return paths.
    pub async fn continue_after_login(
        &self,
    ) -> Result<NavigationOutcome, RouterError> {
        let key = &self.gate.config().redirect_query_key;
        let return_path = self
            .current()
            .and_then(|loc| loc.query_value(key).map(str::to_string))
            .filter(|path| path.starts_with('/') && !path.starts_with("//"));

        match return_path {
            Some(path) => self.navigate(&path).await,
            None => {
                let landing = self.gate.config().landing_route.clone();
                self.navigate_named(&landing, &BTreeMap::new(), &[]).await
            }
        }
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(
        &self,
        generation: u64,
        mut target: Location,
    ) -> Result<NavigationOutcome, RouterError> {
        let requested = target.full_path.clone();
        let mut redirects = 0;

        loop {
            let decision = self.gate.evaluate(&target).await;
            if !self.is_latest(generation) {
                tracing::debug!(to = %requested, "navigation superseded");
                return Ok(NavigationOutcome::Superseded);
            }

            match decision {
                NavigationDecision::Allow => {
                    tracing::debug!(
                        to = %target.full_path,
                        route = %target.name,
                        "navigation committed"
                    );
                    self.current.send_replace(Some(target.clone()));
                    return Ok(NavigationOutcome::Completed(target));
                }
                NavigationDecision::Redirect(redirect) => {
                    redirects += 1;
                    if redirects > self.gate.config().max_redirects {
                        tracing::warn!(to = %requested, "redirect loop");
                        return Err(RouterError::RedirectLoop(requested));
                    }
                    let mut next = self.table.resolve_named(
                        &redirect.name,
                        &BTreeMap::new(),
                        &redirect.query,
                    )?;
                    next.redirected_from = Some(requested.clone());
                    target = next;
                }
            }
        }
    }
}
