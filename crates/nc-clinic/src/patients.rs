//! Patient list for clinicians
//!
//! Patients are listed newest first and joined with their profile names.
//! The list filters by name substring and risk level.

use crate::error::ClinicError;
use crate::tone::Tone;
use nc_core::{PatientId, PatientRecord, Profile, Query, RiskLevel, RowStore, RowStoreExt, Sex, StoreError, Table, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Displayed when a patient has no readable profile
pub const UNKNOWN_NAME: &str = "Unknown";

/// Patient record of a signed-in identity, if it has one
pub async fn patient_for_user<S>(store: &S, user: UserId) -> Result<Option<PatientRecord>, StoreError>
where
    S: RowStore + ?Sized,
{
    store
        .maybe_single(Table::Patients, Query::new().eq("user_id", user))
        .await
}

/// Profile names for a set of identities; unknown ids are absent from the map
pub async fn profile_names<S>(store: &S, users: &[UserId]) -> Result<HashMap<UserId, String>, StoreError>
where
    S: RowStore + ?Sized,
{
    if users.is_empty() {
        return Ok(HashMap::new());
    }
    let query = Query::new().is_in("id", users.iter().copied());
    let profiles: Vec<Profile> = store.select_as(Table::Profiles, &query).await?;
    Ok(profiles.into_iter().map(|p| (p.id, p.name)).collect())
}

/// Patient joined with profile name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRow {
    /// Patient record id
    pub id: PatientId,
    pub user_id: Option<UserId>,
    /// Profile name; `None` for patients without an account
    pub name: Option<String>,
    /// Year of birth
    pub birth_year: i32,
    /// Sex as recorded
    pub sex: Sex,
    /// Unassessed when `None`
    pub risk_level: Option<RiskLevel>,
}

impl PatientRow {
    fn join(record: PatientRecord, names: &HashMap<UserId, String>) -> Self {
        let name = record.user_id.and_then(|id| names.get(&id).cloned());
        Self {
            id: record.id,
            user_id: record.user_id,
            name,
            birth_year: record.birth_year,
            sex: record.sex,
            risk_level: record.risk_level,
        }
    }

    /// Profile name or the unknown placeholder
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    /// Badge colour for the risk level
    #[must_use]
    pub fn risk_tone(&self) -> Tone {
        Tone::for_risk(self.risk_level)
    }

    /// Age reached in `year`
    #[must_use]
    pub fn age_in(&self, year: i32) -> i32 {
        year - self.birth_year
    }
}

/// Risk level filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskFilter {
    /// Any risk, unassessed included
    #[default]
    All,
    /// Exactly this level; unassessed patients never match
    Only(RiskLevel),
}

impl RiskFilter {
    /// Whether a patient at `risk` passes
    #[must_use]
    pub fn admits(self, risk: Option<RiskLevel>) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Only(level) => risk == Some(level),
        }
    }
}

impl FromStr for RiskFilter {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(RiskFilter::All);
        }
        s.parse::<RiskLevel>()
            .map(RiskFilter::Only)
            .map_err(|_| ClinicError::RiskFilter(s.to_string()))
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFilter::All => f.write_str("all"),
            RiskFilter::Only(level) => write!(f, "{level}"),
        }
    }
}

/// Name search plus risk filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFilter {
    /// Case-insensitive substring of the profile name; empty matches all
    pub search: String,
    /// Risk level restriction
    pub risk: RiskFilter,
}

impl PatientFilter {
    /// Filter from a search string and risk selection
    #[must_use]
    pub fn new(search: impl Into<String>, risk: RiskFilter) -> Self {
        Self {
            search: search.into(),
            risk,
        }
    }

    /// Patients without a name never match a non-empty search
    #[must_use]
    pub fn matches(&self, row: &PatientRow) -> bool {
        let by_name = self.search.is_empty()
            || row
                .name
                .as_ref()
                .is_some_and(|name| name.to_lowercase().contains(&self.search.to_lowercase()));
        by_name && self.risk.admits(row.risk_level)
    }

    /// Rows passing the filter, in input order
    #[must_use]
    pub fn apply(&self, rows: &[PatientRow]) -> Vec<PatientRow> {
        rows.iter().filter(|row| self.matches(row)).cloned().collect()
    }
}

/// Patient list service
#[derive(Debug, Clone)]
pub struct PatientsService {
    store: Arc<dyn RowStore>,
}

impl PatientsService {
    /// Service over `store`
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Every patient, newest first
    pub async fn list(&self) -> Result<Vec<PatientRow>, ClinicError> {
        let query = Query::new().order("created_at", false);
        let records: Vec<PatientRecord> = self.store.select_as(Table::Patients, &query).await?;

        let users: Vec<UserId> = records.iter().filter_map(|r| r.user_id).collect();
        let names = profile_names(self.store.as_ref(), &users).await?;

        tracing::debug!(count = records.len(), "patients loaded");
        Ok(records.into_iter().map(|r| PatientRow::join(r, &names)).collect())
    }

    /// Filtered patient list
    pub async fn search(&self, filter: &PatientFilter) -> Result<Vec<PatientRow>, ClinicError> {
        Ok(filter.apply(&self.list().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: Option<&str>, risk: Option<RiskLevel>) -> PatientRow {
        PatientRow {
            id: PatientId::new(),
            user_id: None,
            name: name.map(str::to_string),
            birth_year: 1950,
            sex: Sex::Male,
            risk_level: risk,
        }
    }

    #[test]
    fn search_is_case_insensitive() {
        let filter = PatientFilter::new("ROSS", RiskFilter::All);
        assert!(filter.matches(&row(Some("Maria Rossi"), None)));
        assert!(!filter.matches(&row(Some("Luca Verdi"), None)));
    }

    #[test]
    fn nameless_rows_only_match_empty_search() {
        let nameless = row(None, Some(RiskLevel::High));
        assert!(PatientFilter::default().matches(&nameless));
        assert!(!PatientFilter::new("a", RiskFilter::All).matches(&nameless));
        assert_eq!(nameless.display_name(), UNKNOWN_NAME);
    }

    #[test]
    fn risk_filter_parses() {
        assert_eq!("all".parse::<RiskFilter>().unwrap(), RiskFilter::All);
        assert_eq!("high".parse::<RiskFilter>().unwrap(), RiskFilter::Only(RiskLevel::High));
        assert!("severe".parse::<RiskFilter>().is_err());
        assert_eq!(RiskFilter::Only(RiskLevel::Low).to_string(), "low");
    }

    #[test]
    fn risk_filter_excludes_unset_levels() {
        let filter = PatientFilter::new("", RiskFilter::Only(RiskLevel::Low));
        assert!(!filter.matches(&row(Some("Ada"), None)));
        assert!(filter.matches(&row(Some("Ada"), Some(RiskLevel::Low))));
    }
}
