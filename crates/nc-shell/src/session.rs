//! Session context
//!
//! The shell resolves the current identity and its role once, then publishes
//! both together on a watch channel. Screens only read; the manager is the
//! only writer.

use crate::error::ShellError;
use nc_core::{IdentityService, Role, RowStore, RowStoreExt, SignUpRequest, Query, Table, User, UserRoleRecord};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Identity and role, resolved together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    /// `None` with a user present means the role record could not be read
    pub role: Option<Role>,
}

impl Session {
    /// Known-absent identity
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A user is signed in
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Role used for access checks; an unresolved role grants patient access only
    #[inline]
    #[must_use]
    pub fn effective_role(&self) -> Role {
        self.role.unwrap_or(Role::Patient)
    }
}

/// Resolution lifecycle observed by screens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Identity or role still loading; nothing may route
    Pending,
    /// Lookup finished; the session may be anonymous
    Resolved(Session),
}

impl SessionState {
    /// Identity lookup has finished
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Resolved session, if any
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Resolved(session) => Some(session),
            Self::Pending => None,
        }
    }
}

/// Owner of the process-wide session context
#[derive(Debug)]
pub struct SessionManager {
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn RowStore>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Create context in the pending state
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityService>, store: Arc<dyn RowStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        Self {
            identity,
            store,
            state,
        }
    }

    /// Receive every published state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Identity service the context resolves through
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityService> {
        &self.identity
    }

    /// Look up identity then role, and publish both at once.
    ///
    /// A failed identity lookup resolves to an anonymous session and returns
    /// the error. A failed role lookup keeps the identity with no role.
    pub async fn resolve(&self) -> Result<Session, ShellError> {
        self.state.send_replace(SessionState::Pending);

        let user = match self.identity.current_user().await {
            Ok(user) => user,
            Err(err) => {
                warn!(%err, "identity lookup failed");
                self.publish(Session::anonymous());
                return Err(err.into());
            }
        };

        let role = match &user {
            Some(user) => self.lookup_role(user).await,
            None => None,
        };

        let session = Session { user, role };
        info!(
            authenticated = session.is_authenticated(),
            role = ?session.role,
            "session resolved"
        );
        self.publish(session.clone());
        Ok(session)
    }

    /// Sign in and re-resolve
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ShellError> {
        self.identity.sign_in(email, password).await?;
        self.resolve().await
    }

    /// Create an account and re-resolve
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Session, ShellError> {
        self.identity.sign_up(request).await?;
        self.resolve().await
    }

    /// Invalidate the remote session and clear the local one.
    ///
    /// The local session is cleared even when the remote call fails; the
    /// failure is returned for the caller to report.
    pub async fn sign_out(&self) -> Result<(), ShellError> {
        let remote = self.identity.sign_out().await;
        self.publish(Session::anonymous());
        match remote {
            Ok(()) => {
                info!("signed out");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "remote sign-out failed; local session cleared");
                Err(err.into())
            }
        }
    }

    /// Drop the context; subscribers observe the channel closing
    pub fn teardown(self) {
        info!(subscribers = self.state.receiver_count(), "session context torn down");
    }

    async fn lookup_role(&self, user: &User) -> Option<Role> {
        let query = Query::new().eq("user_id", user.id);
        match self
            .store
            .maybe_single::<UserRoleRecord>(Table::UserRoles, query)
            .await
        {
            Ok(record) => record.map(|r| r.role),
            Err(err) => {
                warn!(user = %user.id, %err, "role lookup failed");
                None
            }
        }
    }

    fn publish(&self, session: Session) {
        self.state.send_replace(SessionState::Resolved(session));
    }
}
