//! Route guard
//!
//! Decides what a protected screen shows from the session state alone:
//! 1. Pending: loading indicator, no navigation
//! 2. No identity: redirect to sign-in
//! 3. Allowed roles given and the role is not among them: redirect to landing
//! 4. Otherwise render

use crate::routes::Route;
use crate::session::SessionState;
use nc_core::Role;

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Resolution pending; show loading
    Loading,
    /// Render nothing and go elsewhere
    Redirect(Route),
    /// Render the screen
    Render,
}

impl GuardDecision {
    /// True for [`GuardDecision::Render`]
    #[inline]
    #[must_use]
    pub fn renders(self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Decide for a screen restricted to `allowed` roles (`None` = any role)
#[must_use]
pub fn decide(state: &SessionState, allowed: Option<&[Role]>) -> GuardDecision {
    let SessionState::Resolved(session) = state else {
        return GuardDecision::Loading;
    };
    if !session.is_authenticated() {
        return GuardDecision::Redirect(Route::SIGN_IN);
    }
    match allowed {
        Some(roles) if !roles.contains(&session.effective_role()) => GuardDecision::Redirect(Route::LANDING),
        _ => GuardDecision::Render,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use nc_core::{User, UserId};

    fn signed_in(role: Option<Role>) -> SessionState {
        SessionState::Resolved(Session {
            user: Some(User {
                id: UserId::new(),
                email: "u@example.it".into(),
            }),
            role,
        })
    }

    #[test]
    fn pending_never_redirects() {
        assert_eq!(decide(&SessionState::Pending, None), GuardDecision::Loading);
        assert_eq!(
            decide(&SessionState::Pending, Some(&[Role::Admin][..])),
            GuardDecision::Loading
        );
    }

    #[test]
    fn any_role_renders_without_restriction() {
        for role in Role::ALL {
            assert!(decide(&signed_in(Some(role)), None).renders());
        }
    }

    #[test]
    fn unresolved_role_counts_as_patient() {
        let state = signed_in(None);
        assert!(decide(&state, Some(&[Role::Patient][..])).renders());
        assert_eq!(
            decide(&state, Some(&[Role::Clinician, Role::Admin][..])),
            GuardDecision::Redirect(Route::Dashboard)
        );
    }
}
