//! Application configuration
//!
//! Every value has a default matching the production rules; a TOML file may
//! override any subset of keys.
//!
//! ```toml
//! [test]
//! max_level = 7
//! max_errors = 3
//!
//! [timing]
//! pulse_ms = 400
//! step_ms = 800
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sequence-memory rules
    pub test: TestRules,
    /// Playback and transition timing
    pub timing: TimingConfig,
    /// Dashboard queries
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With test rules
    #[inline]
    #[must_use]
    pub fn with_rules(mut self, rules: TestRules) -> Self {
        self.test = rules;
        self
    }

    /// With timing
    #[inline]
    #[must_use]
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.test.validate()?;
        self.timing.validate()?;
        if self.dashboard.insight_limit == 0 {
            return Err(ConfigError::Invalid("dashboard.insight_limit must be > 0".into()));
        }
        Ok(())
    }
}

/// Rules of the sequence-memory test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRules {
    /// Clearing this level ends the test
    pub max_level: u32,
    /// Mistakes allowed before the test terminates
    pub max_errors: u32,
    /// Points awarded per cleared level
    pub points_per_level: u32,
    /// Sequence length is `level + base_length`
    pub base_length: u32,
    /// Number of distinct colors
    pub colors: u8,
}

impl TestRules {
    /// Sequence length for a level
    #[inline]
    #[must_use]
    pub fn sequence_length(&self, level: u32) -> usize {
        (level + self.base_length) as usize
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_level == 0 {
            return Err(ConfigError::Invalid("test.max_level must be > 0".into()));
        }
        if self.max_errors == 0 {
            return Err(ConfigError::Invalid("test.max_errors must be > 0".into()));
        }
        if !(1..=4).contains(&self.colors) {
            return Err(ConfigError::Invalid("test.colors must be within 1..=4".into()));
        }
        Ok(())
    }
}

impl Default for TestRules {
    fn default() -> Self {
        Self {
            max_level: 7,
            max_errors: 3,
            points_per_level: 100,
            base_length: 2,
            colors: 4,
        }
    }
}

/// Timing of playback and transitions, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long one element stays highlighted
    pub pulse_ms: u64,
    /// Interval between consecutive highlights
    pub step_ms: u64,
    /// Pause between the end of playback and recall
    pub settle_ms: u64,
    /// Delay before the next attempt after a clear or a mistake
    pub next_attempt_ms: u64,
}

impl TimingConfig {
    /// Highlight duration
    #[inline]
    #[must_use]
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }

    /// Step interval
    #[inline]
    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    /// Settle delay
    #[inline]
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Inter-attempt delay
    #[inline]
    #[must_use]
    pub fn next_attempt(&self) -> Duration {
        Duration::from_millis(self.next_attempt_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.step_ms == 0 {
            return Err(ConfigError::Invalid("timing.step_ms must be > 0".into()));
        }
        if self.pulse_ms > self.step_ms {
            return Err(ConfigError::Invalid(format!(
                "timing.pulse_ms ({}) exceeds timing.step_ms ({})",
                self.pulse_ms, self.step_ms
            )));
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pulse_ms: 400,
            step_ms: 800,
            settle_ms: 800,
            next_attempt_ms: 1500,
        }
    }
}

/// Dashboard query settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Insights shown on the dashboard
    pub insight_limit: usize,
    /// Initial time range in days
    pub default_range_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            insight_limit: 5,
            default_range_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_match_production_rules() {
        let config = AppConfig::new();
        assert_eq!(config.test.max_level, 7);
        assert_eq!(config.test.max_errors, 3);
        assert_eq!(config.test.sequence_length(1), 3);
        assert_eq!(config.timing.pulse(), Duration::from_millis(400));
        assert_eq!(config.timing.next_attempt(), Duration::from_millis(1500));
        assert_eq!(config.dashboard.insight_limit, 5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str("[test]\nmax_errors = 5\n").unwrap();
        assert_eq!(config.test.max_errors, 5);
        assert_eq!(config.test.max_level, 7);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn pulse_longer_than_step_rejected() {
        let err = AppConfig::from_toml_str("[timing]\npulse_ms = 900\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_errors_rejected() {
        let err = AppConfig::from_toml_str("[test]\nmax_errors = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_errors"));
    }

    #[test]
    fn render_then_load() {
        let config = AppConfig::new().with_timing(TimingConfig {
            pulse_ms: 10,
            step_ms: 20,
            settle_ms: 20,
            next_attempt_ms: 30,
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = AppConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AppConfig::load("/nonexistent/neuralcare.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/neuralcare.toml"));
    }
}
