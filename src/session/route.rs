//! Navigation guard.

use std::fmt;

/// Top-level views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Login / registration form
    Login,
    /// Authenticated dashboard
    Dashboard,
}

impl Route {
    /// Parse a path. Unknown paths yield `None` and fall through to the default.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/login" => Some(Self::Login),
            "/dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
        }
    }

    /// The view actually shown for a navigation request.
    ///
    /// The login view is always reachable. The dashboard requires a session.
    /// Anything else lands on the dashboard when signed in, login otherwise.
    pub fn resolve(requested: Option<Route>, authenticated: bool) -> Route {
        match requested {
            Some(Route::Login) => Route::Login,
            Some(Route::Dashboard) | None if authenticated => Route::Dashboard,
            Some(Route::Dashboard) | None => Route::Login,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
