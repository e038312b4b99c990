//! Routes, the route table and path resolution.

use std::collections::BTreeMap;

use crate::RouterError;

// ---------------------------------------------------------------------------
// RouteMeta
// ---------------------------------------------------------------------------

/// Access flags of a route, read by the navigation gate.
///
/// A route may carry neither flag (public), but never both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Only reachable with a session. Anonymous visitors go to login.
    pub requires_auth: bool,

    /// Only reachable without a session (login, register). Signed-in
    /// users go to the landing route.
    pub guest: bool,
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    /// `:name`, exactly one path segment.
    Param(String),
    /// `:name(.*)*`, the rest of the path (possibly empty).
    CatchAll(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(':') {
            Some(param) => match param.strip_suffix("(.*)*") {
                Some(name) => Segment::CatchAll(name.to_string()),
                None => Segment::Param(param.to_string()),
            },
            None => Segment::Static(raw.to_string()),
        }
    }
}

/// A named destination with a path pattern.
///
/// Patterns are `/`-separated. `:slug` captures one segment;
/// `:pathMatch(.*)*` captures everything that is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    name: String,
    pattern: String,
    segments: Vec<Segment>,
    meta: RouteMeta,
}

impl Route {
    /// A public route.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let segments = split_path(&pattern).map(Segment::parse).collect();
        Self {
            name: name.into(),
            pattern,
            segments,
            meta: RouteMeta::default(),
        }
    }

    /// Marks the route as protected.
    pub fn requires_auth(mut self) -> Self {
        self.meta.requires_auth = true;
        self.meta.guest = false;
        self
    }

    /// Marks the route as guest-only.
    pub fn guest(mut self) -> Self {
        self.meta.guest = true;
        self.meta.requires_auth = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn meta(&self) -> RouteMeta {
        self.meta
    }

    /// Matches already split, still encoded path segments.
    fn capture(&self, path: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut rest = path;

        for segment in &self.segments {
            match segment {
                Segment::CatchAll(name) => {
                    let tail: Vec<String> =
                        rest.iter().map(|s| decode_segment(s)).collect();
                    params.insert(name.clone(), tail.join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    let (first, tail) = rest.split_first()?;
                    if *first != expected.as_str() {
                        return None;
                    }
                    rest = tail;
                }
                Segment::Param(name) => {
                    let (first, tail) = rest.split_first()?;
                    params.insert(name.clone(), decode_segment(first));
                    rest = tail;
                }
            }
        }

        rest.is_empty().then_some(params)
    }

    /// Fills the pattern with `params`, encoding each value.
    fn build(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<String, RouterError> {
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => parts.push(s.clone()),
                Segment::Param(name) => {
                    let value = params.get(name).filter(|v| !v.is_empty()).ok_or_else(
                        || RouterError::MissingParam {
                            route: self.name.clone(),
                            param: name.clone(),
                        },
                    )?;
                    parts.push(urlencoding::encode(value).into_owned());
                }
                Segment::CatchAll(name) => {
                    if let Some(rest) = params.get(name).filter(|v| !v.is_empty()) {
                        parts.extend(
                            split_path(rest)
                                .map(|s| urlencoding::encode(s).into_owned()),
                        );
                    }
                }
            }
        }
        Ok(format!("/{}", parts.join("/")))
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A path resolved against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Name of the matched route.
    pub name: String,

    /// Normalized path without query (`/post/hello-world`).
    pub path: String,

    /// Path plus query string, as it would appear in the address bar.
    /// This is what the login redirect carries.
    pub full_path: String,

    pub params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub meta: RouteMeta,

    /// Full path of the navigation target this location replaced, when the
    /// gate redirected.
    pub redirected_from: Option<String>,
}

impl Location {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of the query parameter `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// Ordered set of routes. The first matching pattern wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The PostZen web application's routes.
    pub fn postzen() -> Self {
        Self::new()
            .with_route(Route::new("home", "/"))
            .with_route(Route::new("login", "/login").guest())
            .with_route(Route::new("register", "/register").guest())
            .with_route(Route::new("forgot-password", "/forgot-password").guest())
            .with_route(Route::new("post", "/post/:slug"))
            .with_route(Route::new("write", "/write").requires_auth())
            .with_route(Route::new("edit", "/edit/:id").requires_auth())
            .with_route(Route::new("profile", "/profile").requires_auth())
            .with_route(Route::new("not-found", "/:pathMatch(.*)*"))
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.add(route);
        self
    }

    /// Appends a route. A route with the same name replaces the earlier
    /// one in place.
    pub fn add(&mut self, route: Route) {
        match self.routes.iter_mut().find(|r| r.name == route.name) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Resolves a path with optional query (`/edit/7?draft=1`). A fragment
    /// is ignored.
    pub fn resolve(&self, full_path: &str) -> Result<Location, RouterError> {
        let without_fragment = full_path.split('#').next().unwrap_or_default();
        let (raw_path, raw_query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));

        let segments: Vec<&str> = split_path(raw_path).collect();
        let path = format!("/{}", segments.join("/"));
        let query = parse_query(raw_query);

        let (route, params) = self
            .routes
            .iter()
            .find_map(|route| route.capture(&segments).map(|p| (route, p)))
            .ok_or_else(|| RouterError::NoMatch(path.clone()))?;

        let full_path = if query.is_empty() {
            path.clone()
        } else {
            format!("{path}?{}", encode_query(&query))
        };

        Ok(Location {
            name: route.name.clone(),
            path,
            full_path,
            params,
            query,
            meta: route.meta,
            redirected_from: None,
        })
    }

    /// Resolves a route by name, filling its params and appending `query`.
    pub fn resolve_named(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
        query: &[(String, String)],
    ) -> Result<Location, RouterError> {
        let route = self
            .get(name)
            .ok_or_else(|| RouterError::UnknownRoute(name.to_string()))?;
        let path = route.build(params)?;
        if query.is_empty() {
            self.resolve(&path)
        } else {
            self.resolve(&format!("{path}?{}", encode_query(query)))
        }
    }
}

// ---------------------------------------------------------------------------
// Path and query helpers
// ---------------------------------------------------------------------------

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Percent-decodes a path segment. `+` stays literal here.
fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Form-decodes a query key or value: `+` is a space.
fn decode_query_component(raw: &str) -> String {
    decode_segment(&raw.replace('+', " "))
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_query_component(k), decode_query_component(v))
        })
        .collect()
}

fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| {
            format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
        })
        .collect::<Vec<_>>()
        .join("&")
}
