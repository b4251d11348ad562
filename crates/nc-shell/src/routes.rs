//! Route table
//!
//! Every screen with the roles allowed to open it.

use crate::error::ShellError;
use nc_core::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who may open a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No session required
    Public,
    /// Any signed-in identity
    Authenticated,
    /// Signed-in identity with one of these roles
    Roles(&'static [Role]),
}

impl Access {
    /// Allowed-roles set as the guard consumes it (`None` = any role)
    #[must_use]
    pub fn allowed_roles(self) -> Option<&'static [Role]> {
        match self {
            Access::Roles(roles) => Some(roles),
            Access::Public | Access::Authenticated => None,
        }
    }
}

/// Application screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// Sign-in form
    Login,
    /// Registration form
    Signup,
    /// KPI overview, the landing screen
    Dashboard,
    /// Cognitive tests and their history
    Tests,
    /// Report download, patients only
    Reports,
    /// Patient list for staff
    Patients,
    /// Exercise assignment for staff
    Exercises,
    /// Admin settings panel
    AdminSettings,
}

impl Route {
    /// Every route, public ones first
    pub const ALL: [Route; 8] = [
        Route::Login,
        Route::Signup,
        Route::Dashboard,
        Route::Tests,
        Route::Reports,
        Route::Patients,
        Route::Exercises,
        Route::AdminSettings,
    ];

    /// Sign-in screen, target of unauthenticated redirects
    pub const SIGN_IN: Route = Route::Login;

    /// Landing screen, target of role redirects
    pub const LANDING: Route = Route::Dashboard;

    /// URL path
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Tests => "/tests",
            Route::Reports => "/reports",
            Route::Patients => "/patients",
            Route::Exercises => "/exercises",
            Route::AdminSettings => "/admin/settings",
        }
    }

    /// Who may open the route
    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Route::Login | Route::Signup => Access::Public,
            Route::Dashboard | Route::Tests => Access::Authenticated,
            Route::Reports => Access::Roles(&[Role::Patient]),
            Route::Patients | Route::Exercises => Access::Roles(&[Role::Clinician, Role::Admin]),
            Route::AdminSettings => Access::Roles(&[Role::Admin]),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = ShellError;

    /// Unknown paths and `/` are rejected; callers decide the fallback
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim_end_matches('/');
        Route::ALL
            .into_iter()
            .find(|r| r.path() == trimmed)
            .ok_or_else(|| ShellError::UnknownRoute(path.to_string()))
    }
}
