//! Navigation seam

use parking_lot::Mutex;
use std::fmt;

/// Moves the front end to a path
pub trait Navigator: Send + Sync + fmt::Debug {
    fn navigate(&self, path: &str);
}

/// Navigator recording every visited path
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    /// Recorder with empty history
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visited paths, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Most recent path
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        self.history.lock().push(path.to_string());
    }
}
