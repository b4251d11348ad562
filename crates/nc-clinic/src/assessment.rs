//! Assessment host
//!
//! Runs a sequence-memory session for a patient and records the confirmed
//! score. Cancelled sessions leave no trace.

use crate::error::ClinicError;
use crate::history::HistoryService;
use crate::patients::patient_for_user;
use async_trait::async_trait;
use nc_cogtest::driver::{self, DriverHandle, DriverTask};
use nc_cogtest::{RandomSequence, SequenceGenerator, SequenceTest, TestObserver, TEST_TYPE};
use nc_core::{AppConfig, PatientId, RowStore, TestResult, TimingConfig, UserId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer persisting completed sessions as `test_results` rows
#[derive(Debug)]
pub struct AssessmentHost {
    history: HistoryService,
    patient: PatientId,
    recorded: Mutex<Vec<TestResult>>,
    last_error: Mutex<Option<String>>,
}

impl AssessmentHost {
    /// Host recording results for `patient`
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>, patient: PatientId) -> Self {
        Self {
            history: HistoryService::new(store),
            patient,
            recorded: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
        }
    }

    /// Host for the patient behind `user`
    pub async fn for_user(store: Arc<dyn RowStore>, user: UserId) -> Result<Self, ClinicError> {
        let patient = patient_for_user(store.as_ref(), user)
            .await?
            .ok_or(ClinicError::NotAPatient)?;
        Ok(Self::new(store, patient.id))
    }

    /// Patient results are written for
    #[inline]
    #[must_use]
    pub fn patient(&self) -> PatientId {
        self.patient
    }

    /// Rows written by this host
    #[must_use]
    pub fn recorded(&self) -> Vec<TestResult> {
        self.recorded.lock().clone()
    }

    /// Most recent persistence failure, if any
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Start a session with configured rules and a random generator
    #[must_use]
    pub fn launch(self: &Arc<Self>, config: &AppConfig) -> (DriverHandle, DriverTask) {
        let engine = SequenceTest::new(config.test, RandomSequence::from_entropy());
        self.launch_with(engine, config.timing)
    }

    /// Start a session on a prepared engine
    #[must_use]
    pub fn launch_with<G>(self: &Arc<Self>, engine: SequenceTest<G>, timing: TimingConfig) -> (DriverHandle, DriverTask)
    where
        G: SequenceGenerator + 'static,
    {
        tracing::info!(patient = %self.patient, session = %engine.id(), "assessment launched");
        driver::spawn(engine, timing, Arc::clone(self))
    }
}

#[async_trait]
impl TestObserver for AssessmentHost {
    async fn on_complete(&self, score: u32) {
        match self.history.record_result(self.patient, TEST_TYPE, score).await {
            Ok(row) => self.recorded.lock().push(row),
            Err(err) => {
                tracing::error!(patient = %self.patient, score, %err, "failed to record test result");
                *self.last_error.lock() = Some(err.to_string());
            }
        }
    }

    async fn on_cancel(&self) {
        tracing::info!(patient = %self.patient, "assessment cancelled; nothing recorded");
    }
}
