//! Display tones for scores, KPIs, severities and risk levels

use nc_core::{RiskLevel, Severity};
use serde::Serialize;
use std::fmt;

/// Color category a value is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Within the healthy range
    Success,
    /// Worth watching
    Warning,
    /// Needs attention
    Destructive,
}

impl Tone {
    /// Lowercase name for styling
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Success => "success",
            Tone::Warning => "warning",
            Tone::Destructive => "destructive",
        }
    }

    /// Cognitive score: >= 80 success, >= 60 warning
    #[must_use]
    pub fn for_score(score: f64) -> Self {
        if score >= 80.0 {
            Tone::Success
        } else if score >= 60.0 {
            Tone::Warning
        } else {
            Tone::Destructive
        }
    }

    /// Sleep hours: >= 7 success, anything less is a warning
    #[must_use]
    pub fn for_sleep(hours: f64) -> Self {
        if hours >= 7.0 {
            Tone::Success
        } else {
            Tone::Warning
        }
    }

    /// Reaction time in ms: <= 300 success, <= 400 warning
    #[must_use]
    pub fn for_reaction(ms: u32) -> Self {
        match ms {
            0..=300 => Tone::Success,
            301..=400 => Tone::Warning,
            _ => Tone::Destructive,
        }
    }

    /// Tremor index: <= 0.3 success, <= 0.6 warning
    #[must_use]
    pub fn for_tremor(index: f64) -> Self {
        if index <= 0.3 {
            Tone::Success
        } else if index <= 0.6 {
            Tone::Warning
        } else {
            Tone::Destructive
        }
    }

    /// Low is fine, medium warns, high is destructive
    #[must_use]
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::High => Tone::Destructive,
            Severity::Medium => Tone::Warning,
            Severity::Low => Tone::Success,
        }
    }

    /// Missing risk level renders as low
    #[must_use]
    pub fn for_risk(risk: Option<RiskLevel>) -> Self {
        match risk {
            Some(RiskLevel::High) => Tone::Destructive,
            Some(RiskLevel::Medium) => Tone::Warning,
            Some(RiskLevel::Low) | None => Tone::Success,
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_boundaries() {
        assert_eq!(Tone::for_score(80.0), Tone::Success);
        assert_eq!(Tone::for_score(79.9), Tone::Warning);
        assert_eq!(Tone::for_score(60.0), Tone::Warning);
        assert_eq!(Tone::for_score(59.0), Tone::Destructive);
    }

    #[test]
    fn kpi_boundaries() {
        assert_eq!(Tone::for_sleep(7.0), Tone::Success);
        assert_eq!(Tone::for_sleep(6.9), Tone::Warning);
        assert_eq!(Tone::for_reaction(300), Tone::Success);
        assert_eq!(Tone::for_reaction(400), Tone::Warning);
        assert_eq!(Tone::for_reaction(401), Tone::Destructive);
        assert_eq!(Tone::for_tremor(0.3), Tone::Success);
        assert_eq!(Tone::for_tremor(0.6), Tone::Warning);
        assert_eq!(Tone::for_tremor(0.61), Tone::Destructive);
    }

    #[test]
    fn severity_and_risk() {
        assert_eq!(Tone::for_severity(Severity::High), Tone::Destructive);
        assert_eq!(Tone::for_severity(Severity::Low), Tone::Success);
        assert_eq!(Tone::for_risk(Some(RiskLevel::Medium)), Tone::Warning);
        assert_eq!(Tone::for_risk(None), Tone::Success);
    }
}
