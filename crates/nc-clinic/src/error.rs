//! Error types for clinic services

use nc_core::{AuthError, ExerciseId, ExerciseStatus, StoreError};

/// Errors raised by the screen services
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// Backend read or write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Identity backend failed
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The signed-in identity has no patient record
    #[error("no patient record for the current user")]
    NotAPatient,

    /// Exercise assignment does not exist
    #[error("exercise not found: {0}")]
    ExerciseNotFound(ExerciseId),

    /// Completed and skipped assignments are final
    #[error("exercise is already {from}; cannot move to {to}")]
    ExerciseFinal {
        from: ExerciseStatus,
        to: ExerciseStatus,
    },

    /// Form input rejected
    #[error("{field}: {message}")]
    Form { field: &'static str, message: String },

    /// Time range outside 7, 30 or 90 days
    #[error("unsupported time range: {0} days")]
    TimeRange(u32),

    /// Risk filter not one of all, low, medium, high
    #[error("unknown risk filter: '{0}'")]
    RiskFilter(String),
}

impl ClinicError {
    /// Create form error for field
    pub fn form(field: &'static str, message: impl Into<String>) -> Self {
        Self::Form {
            field,
            message: message.into(),
        }
    }

    /// Check if error is the caller's input rather than the backend
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Store(_) => false,
            Self::Auth(err) => err.is_user_error(),
            _ => true,
        }
    }
}
