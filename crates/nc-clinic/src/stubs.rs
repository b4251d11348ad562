//! Placeholder screens
//!
//! Report generation and admin settings have no backend yet; both answer
//! with a notice.

use serde::Serialize;

/// User-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Heading
    pub title: &'static str,
    /// Body text
    pub message: &'static str,
}

impl Notice {
    /// Always true for now; callers render it instead of content
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        true
    }
}

/// Requested PDF report for the signed-in patient
#[must_use]
pub fn generate_report() -> Notice {
    tracing::debug!("report generation requested");
    Notice {
        title: "Report Generation",
        message: "PDF report generation feature will be available soon.",
    }
}

/// Admin settings panel
#[must_use]
pub fn admin_settings() -> Notice {
    Notice {
        title: "Admin Settings",
        message: "Admin settings panel will be available soon.",
    }
}
