//! Patient dashboard
//!
//! Averages the patient's measurements over a 7, 30 or 90 day window and
//! lists the latest insights. Identities without a patient record get an
//! empty dashboard.

use crate::error::ClinicError;
use crate::patients::patient_for_user;
use crate::tone::Tone;
use chrono::{Days, NaiveDate, Utc};
use nc_core::{DashboardConfig, Insight, Measurement, Query, Role, RowStore, RowStoreExt, Table, UserId};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// Measurement window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeRange {
    /// Last 7 days
    #[default]
    Week,
    /// Last 30 days
    Month,
    /// Last 90 days
    Quarter,
}

impl TimeRange {
    /// Selectable ranges, shortest first
    pub const ALL: [TimeRange; 3] = [TimeRange::Week, TimeRange::Month, TimeRange::Quarter];

    /// Window length in days
    #[must_use]
    pub fn days(self) -> u32 {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
        }
    }

    /// Range for a 7, 30 or 90 day window
    pub fn from_days(days: u32) -> Result<Self, ClinicError> {
        TimeRange::ALL
            .into_iter()
            .find(|r| r.days() == days)
            .ok_or(ClinicError::TimeRange(days))
    }

    /// First date inside the window ending `today`
    #[must_use]
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.days())))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl FromStr for TimeRange {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s.trim().parse::<u32>().map_err(|_| ClinicError::TimeRange(0))?;
        TimeRange::from_days(days)
    }
}

/// Averaged KPIs over the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Rounded to an integer
    pub cognitive_score: f64,
    /// One decimal
    pub sleep_hours: f64,
    /// Rounded to an integer
    pub reaction_ms: u32,
    /// Two decimals
    pub tremor_index: f64,
}

impl DashboardStats {
    /// `None` when there are no measurements
    #[must_use]
    pub fn from_measurements(measurements: &[Measurement]) -> Option<Self> {
        if measurements.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = measurements.len() as f64;
        let mean = |f: fn(&Measurement) -> f64| measurements.iter().map(f).sum::<f64>() / n;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let reaction_ms = mean(|m| f64::from(m.reaction_ms)).round() as u32;
        Some(Self {
            cognitive_score: mean(|m| m.cognitive_score).round(),
            sleep_hours: round_to(mean(|m| m.sleep_hours), 1),
            reaction_ms,
            tremor_index: round_to(mean(|m| m.tremor_level), 2),
        })
    }

    /// Colour for the cognitive score card
    #[must_use]
    pub fn cognitive_tone(&self) -> Tone {
        Tone::for_score(self.cognitive_score)
    }

    /// Colour for the sleep card
    #[must_use]
    pub fn sleep_tone(&self) -> Tone {
        Tone::for_sleep(self.sleep_hours)
    }

    /// Colour for the reaction time card
    #[must_use]
    pub fn reaction_tone(&self) -> Tone {
        Tone::for_reaction(self.reaction_ms)
    }

    /// Colour for the tremor card
    #[must_use]
    pub fn tremor_tone(&self) -> Tone {
        Tone::for_tremor(self.tremor_index)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Insight with its display tone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightCard {
    /// Source row
    pub insight: Insight,
    /// Derived from the insight severity
    pub tone: Tone,
}

impl From<Insight> for InsightCard {
    fn from(insight: Insight) -> Self {
        let tone = Tone::for_severity(insight.severity);
        Self { insight, tone }
    }
}

/// Everything the dashboard shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    /// Window the stats cover
    pub range: TimeRange,
    /// `None` when the window holds no measurements
    pub stats: Option<DashboardStats>,
    /// Latest first
    pub insights: Vec<InsightCard>,
}

/// Dashboard loader
#[derive(Debug, Clone)]
pub struct DashboardService {
    store: Arc<dyn RowStore>,
    config: DashboardConfig,
}

impl DashboardService {
    /// Service reading `config` for the default range and insight count
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>, config: DashboardConfig) -> Self {
        Self { store, config }
    }

    /// Configured initial range; falls back to a week if unsupported
    #[must_use]
    pub fn default_range(&self) -> TimeRange {
        TimeRange::from_days(self.config.default_range_days).unwrap_or_default()
    }

    /// Load for today
    pub async fn load(&self, user: UserId, role: Option<Role>, range: TimeRange) -> Result<Dashboard, ClinicError> {
        self.load_on(user, role, range, Utc::now().date_naive()).await
    }

    /// Load with the window ending on `today`
    pub async fn load_on(
        &self,
        user: UserId,
        role: Option<Role>,
        range: TimeRange,
        today: NaiveDate,
    ) -> Result<Dashboard, ClinicError> {
        let empty = Dashboard {
            range,
            ..Dashboard::default()
        };
        if role != Some(Role::Patient) {
            return Ok(empty);
        }
        let Some(patient) = patient_for_user(self.store.as_ref(), user).await? else {
            tracing::debug!(%user, "no patient record; empty dashboard");
            return Ok(empty);
        };

        let query = Query::new()
            .eq("patient_id", patient.id)
            .gte("date", range.start(today).to_string())
            .order("date", false);
        let measurements: Vec<Measurement> = self.store.select_as(Table::Measurements, &query).await?;

        let query = Query::new()
            .eq("patient_id", patient.id)
            .order("date", false)
            .limit(self.config.insight_limit);
        let insights: Vec<Insight> = self.store.select_as(Table::Insights, &query).await?;

        tracing::debug!(
            patient = %patient.id,
            days = range.days(),
            measurements = measurements.len(),
            "dashboard loaded"
        );
        Ok(Dashboard {
            range,
            stats: DashboardStats::from_measurements(&measurements),
            insights: insights.into_iter().map(InsightCard::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_core::PatientId;

    fn measurement(cognitive: f64, sleep: f64, reaction: u32, tremor: f64) -> Measurement {
        serde_json::from_value(serde_json::json!({
            "id": "6f1c2a4e-8d0b-4d59-9a53-2b5e0c3f7a10",
            "patient_id": PatientId::new(),
            "date": "2025-03-14",
            "cognitive_score": cognitive,
            "sleep_hours": sleep,
            "reaction_ms": reaction,
            "tremor_level": tremor,
        }))
        .unwrap()
    }

    #[test]
    fn no_measurements_no_stats() {
        assert_eq!(DashboardStats::from_measurements(&[]), None);
    }

    #[test]
    fn averages_are_rounded_per_kpi() {
        let stats = DashboardStats::from_measurements(&[
            measurement(81.0, 7.0, 280, 0.2),
            measurement(78.0, 6.25, 321, 0.3),
        ])
        .unwrap();
        assert_eq!(stats.cognitive_score, 80.0);
        assert_eq!(stats.sleep_hours, 6.6);
        assert_eq!(stats.reaction_ms, 301);
        assert_eq!(stats.tremor_index, 0.25);
        assert_eq!(stats.cognitive_tone(), Tone::Success);
        assert_eq!(stats.sleep_tone(), Tone::Warning);
        assert_eq!(stats.reaction_tone(), Tone::Warning);
        assert_eq!(stats.tremor_tone(), Tone::Success);
    }

    #[test]
    fn ranges() {
        assert_eq!("30".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert!("14".parse::<TimeRange>().is_err());
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(TimeRange::Week.start(today), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    }
}
