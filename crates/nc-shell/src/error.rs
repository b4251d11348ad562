//! Error types for the navigation shell

use nc_core::{AuthError, StoreError};

/// Shell errors
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Identity service failed
    #[error("identity error: {0}")]
    Auth(#[from] AuthError),

    /// Role lookup failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Session context was torn down
    #[error("session context closed")]
    Closed,

    /// Path does not name a known route
    #[error("unknown route: {0}")]
    UnknownRoute(String),
}

impl ShellError {
    /// Check if the failure came from a collaborator rather than the shell
    #[inline]
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Store(_))
    }
}
