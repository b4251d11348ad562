//! Testing utilities for the NeuralCare workspace
//!
//! Shared fixtures: a seeded in-memory backend with one account per role and
//! an observer that records assessment outcomes.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use nc_cogtest::{TestObserver, TestOutcome};
use nc_core::store::encode_row;
use nc_core::{
    Filter, IdentityService, Insight, Measurement, MemoryIdentity, MemoryStore, NewInsight, NewMeasurement,
    NewTestResult, PatientId, PatientRecord, Query, RiskLevel, Role, RowStore, RowStoreExt, Severity, Sex,
    SignUpMetadata, SignUpRequest, Table, TestResult, User, UserId,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

pub const PASSWORD: &str = "secret123";
pub const PATIENT_EMAIL: &str = "maria.rossi@example.it";
pub const CLINICIAN_EMAIL: &str = "dr.bianchi@example.it";
pub const ADMIN_EMAIL: &str = "admin@example.it";

/// Observer keeping every outcome it receives
#[derive(Debug, Default)]
pub struct RecordingObserver {
    outcomes: Mutex<Vec<TestOutcome>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn outcomes(&self) -> Vec<TestOutcome> {
        self.outcomes.lock().clone()
    }
}

#[async_trait]
impl TestObserver for RecordingObserver {
    async fn on_complete(&self, score: u32) {
        self.outcomes.lock().push(TestOutcome::Completed(score));
    }

    async fn on_cancel(&self) {
        self.outcomes.lock().push(TestOutcome::Cancelled);
    }
}

/// In-memory backend with demo accounts and patient data
#[derive(Debug, Clone)]
pub struct DemoBackend {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
    pub patient: User,
    pub patient_id: PatientId,
    pub clinician: User,
    pub admin: User,
}

impl DemoBackend {
    /// Sign in one of the demo accounts
    pub async fn sign_in(&self, role: Role) -> User {
        let email = match role {
            Role::Patient => PATIENT_EMAIL,
            Role::Clinician => CLINICIAN_EMAIL,
            Role::Admin => ADMIN_EMAIL,
        };
        self.identity.sign_in(email, PASSWORD).await.unwrap()
    }
}

pub fn request(email: &str, name: &str, role: Role) -> SignUpRequest {
    let patient = role == Role::Patient;
    SignUpRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        metadata: SignUpMetadata {
            name: name.to_string(),
            role,
            birth_year: patient.then_some(1948),
            sex: patient.then_some(Sex::Female),
        },
    }
}

pub fn days_ago(days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(days)
}

/// Empty backend with identity wired to the store
#[must_use]
pub fn empty_backend() -> (Arc<MemoryStore>, Arc<MemoryIdentity>) {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(MemoryIdentity::new(store.clone()));
    (store, identity)
}

/// Backend with a patient, a clinician following them and an admin.
///
/// The patient has four measurements (0, 3, 20 and 60 days old), three
/// insights and three sequence-memory results. Nobody is signed in.
pub async fn seeded_backend() -> DemoBackend {
    let (store, identity) = empty_backend();

    let patient = identity
        .sign_up(request(PATIENT_EMAIL, "Maria Rossi", Role::Patient))
        .await
        .unwrap();
    let clinician = identity
        .sign_up(request(CLINICIAN_EMAIL, "Luca Bianchi", Role::Clinician))
        .await
        .unwrap();
    let admin = identity
        .sign_up(request(ADMIN_EMAIL, "Admin", Role::Admin))
        .await
        .unwrap();
    identity.sign_out().await.unwrap();

    let record: PatientRecord = store
        .maybe_single(Table::Patients, Query::new().eq("user_id", patient.id))
        .await
        .unwrap()
        .unwrap();
    let patient_id = record.id;

    let patch = ClinicianPatch {
        clinician_id: clinician.id,
        risk_level: RiskLevel::Medium,
    };
    let patch = encode_row(Table::Patients, &patch).unwrap();
    store
        .update(Table::Patients, patch, &[Filter::eq("id", patient_id)])
        .await
        .unwrap();

    for (age, cognitive, sleep, reaction, tremor) in [
        (0, 82.0, 7.5, 280, 0.2),
        (3, 78.0, 6.5, 320, 0.3),
        (20, 64.0, 6.0, 390, 0.5),
        (60, 55.0, 5.5, 420, 0.7),
    ] {
        let measurement = NewMeasurement {
            patient_id,
            date: days_ago(age),
            cognitive_score: cognitive,
            sleep_hours: sleep,
            reaction_ms: reaction,
            tremor_level: tremor,
        };
        let _: Measurement = store.insert_as(Table::Measurements, &measurement).await.unwrap();
    }

    for (age, severity, title) in [
        (1, Severity::Low, "Stable sleep pattern"),
        (4, Severity::High, "Reaction time increase"),
        (9, Severity::Medium, "Tremor variability"),
    ] {
        let insight = NewInsight {
            patient_id,
            date: Some(days_ago(age)),
            severity,
            title: title.to_string(),
            body: format!("{title} observed over the last days."),
        };
        let _: Insight = store.insert_as(Table::Insights, &insight).await.unwrap();
    }

    for (age, score) in [(2, 72), (10, 80), (30, 80)] {
        let result = NewTestResult {
            patient_id,
            date: Some(days_ago(age)),
            test_type: nc_cogtest::TEST_TYPE.to_string(),
            score,
        };
        let _: TestResult = store.insert_as(Table::TestResults, &result).await.unwrap();
    }

    DemoBackend {
        store,
        identity,
        patient,
        patient_id,
        clinician,
        admin,
    }
}

#[derive(Serialize)]
struct ClinicianPatch {
    clinician_id: UserId,
    risk_level: RiskLevel,
}
