//! Navigation shell
//!
//! Ties the session context, the route guard, the menu and the navigator
//! together.

use crate::error::ShellError;
use crate::guard::{decide, GuardDecision};
use crate::menu::{menu_for, MenuItem};
use crate::navigator::Navigator;
use crate::routes::{Access, Route};
use crate::session::{SessionManager, SessionState};
use std::sync::Arc;

/// Result of signing out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutReport {
    /// Remote invalidation error, if the backend refused
    pub remote_error: Option<String>,
}

impl SignOutReport {
    /// The backend invalidated the session as well
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.remote_error.is_none()
    }
}

/// Application shell
#[derive(Debug)]
pub struct Shell {
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
}

impl Shell {
    /// Shell over `session`, navigating through `navigator`
    #[must_use]
    pub fn new(session: SessionManager, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Session context shared with the screens
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Guard `route` against the current state, navigating on redirect
    pub fn check(&self, route: Route) -> GuardDecision {
        let decision = match route.access() {
            Access::Public => GuardDecision::Render,
            access => decide(&self.session.state(), access.allowed_roles()),
        };
        if let GuardDecision::Redirect(target) = decision {
            tracing::info!(from = %route, to = %target, "guard redirect");
            self.navigator.navigate(target.path());
        }
        decision
    }

    /// Wait for resolution, then guard `route`
    pub async fn enter(&self, route: Route) -> Result<GuardDecision, ShellError> {
        let mut state = self.session.subscribe();
        state
            .wait_for(SessionState::is_resolved)
            .await
            .map_err(|_| ShellError::Closed)?;
        Ok(self.check(route))
    }

    /// Menu for the current role
    #[must_use]
    pub fn menu(&self) -> &'static [MenuItem] {
        let role = self.session.state().session().and_then(|s| s.role);
        menu_for(role)
    }

    /// Sign out and go to sign-in whatever the backend answers
    pub async fn sign_out(&self) -> SignOutReport {
        let remote_error = self.session.sign_out().await.err().map(|e| e.to_string());
        self.navigator.navigate(Route::SIGN_IN.path());
        SignOutReport { remote_error }
    }

    /// Tear down the session context
    pub fn teardown(self) {
        self.session.teardown();
    }
}
