//! Error types for the assessment engine and its driver

use crate::engine::Phase;

/// Engine operation invoked out of turn
///
/// Wrong colors are not errors; they are counted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestError {
    /// Operation not available in the current phase
    #[error("{operation} is not available during {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    /// Input arrived while the next attempt is being prepared
    #[error("input ignored while the next attempt is pending")]
    AttemptPending,

    /// Cancellation requested while the sequence is playing
    #[error("cannot cancel while the sequence is playing")]
    CancelDuringPlayback,

    /// Phase change outside the transition table
    #[error("illegal phase transition: {from} -> {to}")]
    IllegalTransition { from: Phase, to: Phase },

    /// Session was confirmed or cancelled
    #[error("test session is closed")]
    Closed,

    /// Unparseable color input
    #[error("unknown color: '{0}'")]
    UnknownColor(String),
}

impl TestError {
    /// Check if the caller may simply retry later in the session
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AttemptPending | Self::CancelDuringPlayback | Self::InvalidPhase { .. }
        )
    }
}

/// Errors from the async driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Engine rejected the command
    #[error(transparent)]
    Test(#[from] TestError),

    /// Driver task has exited
    #[error("driver stopped")]
    Stopped,

    /// Driver task panicked or was aborted
    #[error("driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
