//! Application routes and the navigation seam.
//!
//! The session store never drives a router directly; it hands a [`Route`]
//! to whatever [`Navigator`] the host installed (a browser history shim, the
//! CLI's stderr reporter, a test recorder).

#[cfg(test)]
#[path = "navigate_test.rs"]
mod navigate_test;

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    AdminBooks,
    AdminBorrows,
    AdminUsers,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::AdminBooks => "/admin/books",
            Self::AdminBorrows => "/admin/borrows",
            Self::AdminUsers => "/admin/users",
        }
    }

    /// Whether the route may be shown without a signed-in user.
    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Home | Self::Login | Self::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Receives redirects issued by the session store.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

impl<F> Navigator for F
where
    F: Fn(Route) + Send + Sync,
{
    fn navigate(&self, route: Route) {
        self(route);
    }
}
