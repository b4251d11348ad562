//! Core domain types for NeuralCare
//!
//! Defines the records stored by the hosted backend:
//! - Identifiers for users, patients and exercise assignments
//! - Roles and the other textual enums used by the tables
//! - Typed row records and their insert shapes

use crate::error::ParseEnumError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate new random identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for serde_json::Value {
            fn from(id: $name) -> Self {
                serde_json::Value::String(id.0.to_string())
            }
        }
    };
}

uuid_id!(
    /// Identity handle issued by the auth backend (also the profile id)
    UserId
);
uuid_id!(
    /// Row id of a patient record
    PatientId
);
uuid_id!(
    /// Row id of an exercise assignment
    ExerciseId
);

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Wire representation
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }

        impl From<$name> for serde_json::Value {
            fn from(value: $name) -> Self {
                serde_json::Value::String(value.as_str().to_string())
            }
        }
    };
}

/// Access-control category of a signed-in identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Person taking assessments and exercises
    Patient,
    /// Doctor following patients and assigning exercises
    Clinician,
    /// Platform administrator
    Admin,
}

text_enum!(Role, "role", {
    Patient => "patient",
    Clinician => "clinician",
    Admin => "admin",
});

impl Role {
    /// All roles, least privileged first
    pub const ALL: [Role; 3] = [Role::Patient, Role::Clinician, Role::Admin];
}

/// Biological sex as captured at sign-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// Male
    #[serde(rename = "M")]
    Male,
    /// Female
    #[serde(rename = "F")]
    Female,
}

text_enum!(Sex, "sex", {
    Male => "M",
    Female => "F",
});

/// Clinical risk category of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

text_enum!(RiskLevel, "risk level", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Severity of a generated insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

text_enum!(Severity, "severity", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Kind of cognitive exercise a clinician can assign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    #[default]
    Memory,
    Attention,
    Reasoning,
    Language,
}

text_enum!(ExerciseType, "exercise type", {
    Memory => "memory",
    Attention => "attention",
    Reasoning => "reasoning",
    Language => "language",
});

impl ExerciseType {
    /// Display label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "Memory",
            Self::Attention => "Attention",
            Self::Reasoning => "Reasoning",
            Self::Language => "Language",
        }
    }
}

/// Lifecycle of an exercise assignment
///
/// `Pending` moves to `Completed` or `Skipped`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStatus {
    /// Awaiting the patient
    #[default]
    Pending,
    /// Done, possibly with a score
    Completed,
    /// Declined by the patient
    Skipped,
}

text_enum!(ExerciseStatus, "exercise status", {
    Pending => "pending",
    Completed => "completed",
    Skipped => "skipped",
});

impl ExerciseStatus {
    /// Check whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Display label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Skipped => "Skipped",
        }
    }
}

/// `profiles` row (id equals the auth user id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Same as the auth user id
    pub id: UserId,
    /// Login e-mail
    pub email: String,
    /// Display name
    pub name: String,
    /// Patients only
    #[serde(default)]
    pub birth_year: Option<i32>,
    /// Patients only
    #[serde(default)]
    pub sex: Option<Sex>,
}

/// `user_roles` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleRecord {
    /// Row id
    pub id: Uuid,
    pub user_id: UserId,
    /// Granted role
    pub role: Role,
}

/// `patients` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Row id
    pub id: PatientId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Assigned clinician
    #[serde(default)]
    pub clinician_id: Option<UserId>,
    /// Year of birth
    pub birth_year: i32,
    /// Sex
    pub sex: Sex,
    /// `None` until assessed
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// Free-text diagnoses
    #[serde(default)]
    pub conditions: Option<Vec<String>>,
    /// Insertion time, set by the backend
    pub created_at: DateTime<Utc>,
}

/// Insert shape for `patients`
#[derive(Debug, Clone, Serialize)]
pub struct NewPatient {
    pub user_id: Option<UserId>,
    /// Assigned clinician
    pub clinician_id: Option<UserId>,
    /// Year of birth
    pub birth_year: i32,
    /// Sex
    pub sex: Sex,
    /// `None` until assessed
    pub risk_level: Option<RiskLevel>,
}

/// `measurements` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Row id
    pub id: Uuid,
    /// Owning patient
    pub patient_id: PatientId,
    /// Day of the reading
    pub date: NaiveDate,
    /// 0..=100
    pub cognitive_score: f64,
    /// Hours slept the night before
    pub sleep_hours: f64,
    /// Mean reaction time in milliseconds
    pub reaction_ms: u32,
    /// Tremor index, 0..=1
    pub tremor_level: f64,
}

/// Insert shape for `measurements`
#[derive(Debug, Clone, Serialize)]
pub struct NewMeasurement {
    /// Owning patient
    pub patient_id: PatientId,
    /// Day of the reading
    pub date: NaiveDate,
    /// 0..=100
    pub cognitive_score: f64,
    /// Hours slept the night before
    pub sleep_hours: f64,
    /// Mean reaction time in milliseconds
    pub reaction_ms: u32,
    /// Tremor index, 0..=1
    pub tremor_level: f64,
}

/// `insights` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Row id
    pub id: Uuid,
    /// Owning patient
    pub patient_id: PatientId,
    /// Day the insight was generated
    pub date: NaiveDate,
    /// Drives the card colour
    pub severity: Severity,
    /// Headline
    pub title: String,
    /// Explanation
    pub body: String,
}

/// Insert shape for `insights`
#[derive(Debug, Clone, Serialize)]
pub struct NewInsight {
    /// Owning patient
    pub patient_id: PatientId,
    /// Defaults to today
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Drives the card colour
    pub severity: Severity,
    /// Headline
    pub title: String,
    /// Explanation
    pub body: String,
}

/// `test_results` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Row id
    pub id: Uuid,
    /// Owning patient
    pub patient_id: PatientId,
    /// Day the test was taken
    pub date: NaiveDate,
    /// Test name, e.g. `sequence_memory`
    pub test_type: String,
    /// 0..=100
    pub score: u32,
}

/// Insert shape for `test_results`
#[derive(Debug, Clone, Serialize)]
pub struct NewTestResult {
    /// Owning patient
    pub patient_id: PatientId,
    /// Defaults to today
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Test name, e.g. `sequence_memory`
    pub test_type: String,
    /// 0..=100
    pub score: u32,
}

/// `assigned_exercises` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedExercise {
    /// Row id
    pub id: ExerciseId,
    /// Assignee
    pub patient_id: PatientId,
    /// Assigning clinician
    pub clinician_id: UserId,
    /// Short name
    pub title: String,
    /// Purpose
    pub description: String,
    /// Cognitive domain trained
    pub exercise_type: ExerciseType,
    /// Steps for the patient
    pub instructions: String,
    /// Suggested length
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// Lifecycle state
    pub status: ExerciseStatus,
    /// Self-reported score, 0..=100
    #[serde(default)]
    pub score: Option<u32>,
    /// Day assigned
    pub assigned_date: NaiveDate,
    /// Set when completed
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
}

/// Insert shape for `assigned_exercises`
#[derive(Debug, Clone, Serialize)]
pub struct NewAssignedExercise {
    /// Assignee
    pub patient_id: PatientId,
    /// Assigning clinician
    pub clinician_id: UserId,
    /// Short name
    pub title: String,
    /// Purpose
    pub description: String,
    /// Cognitive domain trained
    pub exercise_type: ExerciseType,
    /// Steps for the patient
    pub instructions: String,
    /// Suggested length
    pub duration_minutes: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_text_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn role_serde_is_lowercase() {
        let json = serde_json::to_string(&Role::Clinician).unwrap();
        assert_eq!(json, "\"clinician\"");
    }

    #[test]
    fn sex_uses_single_letter() {
        assert_eq!(serde_json::to_value(Sex::Female).unwrap(), "F");
        assert_eq!("M".parse::<Sex>().unwrap(), Sex::Male);
    }

    #[test]
    fn exercise_status_terminality() {
        assert!(!ExerciseStatus::Pending.is_terminal());
        assert!(ExerciseStatus::Completed.is_terminal());
        assert!(ExerciseStatus::Skipped.is_terminal());
    }

    #[test]
    fn ids_are_transparent_strings() {
        let id = PatientId::new();
        let value = serde_json::to_value(id).unwrap();
        assert_eq!(value, serde_json::Value::from(id));
    }

    #[test]
    fn test_result_decodes_from_row() {
        let row = serde_json::json!({
            "id": "6f1c2a4e-8d0b-4d59-9a53-2b5e0c3f7a10",
            "patient_id": "0b8f7d9e-1c2a-4b3c-8d4e-5f6a7b8c9d0e",
            "date": "2025-03-14",
            "test_type": "sequence_memory",
            "score": 86,
            "created_at": "2025-03-14T10:00:00Z"
        });
        let result: TestResult = serde_json::from_value(row).unwrap();
        assert_eq!(result.score, 86);
        assert_eq!(result.date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }
}
