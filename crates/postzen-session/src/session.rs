//! Session types: the snapshot of who is signed in, and where it is
//! persisted.

use postzen_protocol::User;

// ---------------------------------------------------------------------------
// StorageKeys
// ---------------------------------------------------------------------------

/// Keys under which the session is persisted.
///
/// The defaults match what the PostZen web frontend writes to local
/// storage, so a client sharing that store restores the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access_token: String,
    pub refresh_token: String,
    /// JSON-serialized [`User`].
    pub user: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            access_token: "accessToken".into(),
            refresh_token: "refreshToken".into(),
            user: "user".into(),
        }
    }
}

impl StorageKeys {
    /// All three keys, in persistence order.
    pub fn all(&self) -> [&str; 3] {
        [
            self.user.as_str(),
            self.refresh_token.as_str(),
            self.access_token.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated state of the client.
///
/// A session is either fully anonymous or fully authenticated: an access
/// token never exists without a user and vice versa. Encoding that in the
/// enum makes a half-populated session unrepresentable.
///
/// ```text
///   Anonymous ──(login / register / restore)──→ Authenticated
///       ↑                                          │  ↺ refresh
///       └──────(logout / refresh failure / 401)────┘
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,

    Authenticated {
        access_token: String,
        /// Absent only for sessions restored from a store that never held
        /// one; such a session cannot be refreshed.
        refresh_token: Option<String>,
        user: User,
    },
}

impl Session {
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: User,
    ) -> Self {
        Self::Authenticated {
            access_token: access_token.into(),
            refresh_token,
            user,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    /// `true` when the signed-in user has the `ADMIN` role.
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { access_token, .. } => Some(access_token),
            Session::Anonymous => None,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { refresh_token, .. } => {
                refresh_token.as_deref()
            }
            Session::Anonymous => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated { user, .. } => Some(user),
            Session::Anonymous => None,
        }
    }
}
