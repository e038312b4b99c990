//! Router configuration.

/// Names the gate needs to build its redirects.
///
/// The defaults match the PostZen route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Where anonymous visitors of protected routes are sent.
    pub login_route: String,

    /// Where signed-in users visiting guest-only routes are sent.
    pub landing_route: String,

    /// Query key carrying the originally requested path to the login
    /// route.
    pub redirect_query_key: String,

    /// Redirects followed within one navigation before giving up.
    pub max_redirects: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            login_route: "login".into(),
            landing_route: "home".into(),
            redirect_query_key: "redirect".into(),
            max_redirects: 8,
        }
    }
}
