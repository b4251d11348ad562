//! Test history
//!
//! A patient's assessment results, newest first, each compared with the one
//! before it.

use crate::error::ClinicError;
use crate::patients::patient_for_user;
use crate::tone::Tone;
use nc_core::{NewTestResult, PatientId, Query, RowStore, RowStoreExt, Table, TestResult, UserId};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

/// Direction of a score against the previous result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Improved
    Up,
    /// Worsened
    Down,
    /// Unchanged
    Stable,
}

impl Trend {
    /// Direction from `previous` to `current`
    #[must_use]
    pub fn between(current: u32, previous: u32) -> Self {
        match current.cmp(&previous) {
            Ordering::Greater => Trend::Up,
            Ordering::Less => Trend::Down,
            Ordering::Equal => Trend::Stable,
        }
    }
}

/// Trend for each score of a newest-first list; the oldest has none
#[must_use]
pub fn trends(scores: &[u32]) -> Vec<Option<Trend>> {
    (0..scores.len())
        .map(|i| scores.get(i + 1).map(|&previous| Trend::between(scores[i], previous)))
        .collect()
}

/// One history line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    /// Stored result
    pub result: TestResult,
    /// Against the next older result; `None` for the oldest
    pub trend: Option<Trend>,
    /// Score colour
    pub tone: Tone,
}

/// Result history and recording
#[derive(Debug, Clone)]
pub struct HistoryService {
    store: Arc<dyn RowStore>,
}

impl HistoryService {
    /// Service over `store`
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// History of the patient behind `user`; empty when there is none
    pub async fn for_user(&self, user: UserId) -> Result<Vec<HistoryRow>, ClinicError> {
        match patient_for_user(self.store.as_ref(), user).await? {
            Some(patient) => self.for_patient(patient.id).await,
            None => {
                tracing::debug!(%user, "no patient record; empty history");
                Ok(Vec::new())
            }
        }
    }

    /// Results of a patient, newest first
    pub async fn for_patient(&self, patient: PatientId) -> Result<Vec<HistoryRow>, ClinicError> {
        let query = Query::new()
            .eq("patient_id", patient)
            .order("date", false)
            .order("created_at", false);
        let results: Vec<TestResult> = self.store.select_as(Table::TestResults, &query).await?;

        let scores: Vec<u32> = results.iter().map(|r| r.score).collect();
        Ok(results
            .into_iter()
            .zip(trends(&scores))
            .map(|(result, trend)| HistoryRow {
                tone: Tone::for_score(f64::from(result.score)),
                result,
                trend,
            })
            .collect())
    }

    /// Insert a result dated today
    pub async fn record_result(
        &self,
        patient: PatientId,
        test_type: &str,
        score: u32,
    ) -> Result<TestResult, ClinicError> {
        let record = NewTestResult {
            patient_id: patient,
            date: None,
            test_type: test_type.to_string(),
            score,
        };
        let stored: TestResult = self.store.insert_as(Table::TestResults, &record).await?;
        tracing::info!(%patient, test_type, score, "test result recorded");
        Ok(stored)
    }
}
