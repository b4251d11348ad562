//! Exercise assignments
//!
//! Clinicians assign exercises to patients; patients complete or skip them.
//! `pending` moves once, to `completed` or `skipped`.

use crate::error::ClinicError;
use crate::patients::{patient_for_user, profile_names};
use chrono::{NaiveDate, Utc};
use nc_core::{
    AssignedExercise, ExerciseId, ExerciseStatus, ExerciseType, Filter, NewAssignedExercise, PatientId,
    PatientRecord, Query, RowStore, RowStoreExt, Table, UserId,
};
use nc_core::store::encode_row;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Shown when an assignment's patient has no readable profile
pub const MISSING_PATIENT_NAME: &str = "N/A";

/// Shown in the patient picker for nameless patients
pub const UNNAMED_PATIENT: &str = "Unnamed";

/// Assignment enriched with the patient's name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRow {
    /// Stored assignment
    pub exercise: AssignedExercise,
    /// Profile name of the patient, if one is linked
    pub patient_name: Option<String>,
}

impl ExerciseRow {
    /// Patient name or the placeholder for a missing one
    #[must_use]
    pub fn display_patient(&self) -> &str {
        self.patient_name.as_deref().unwrap_or(MISSING_PATIENT_NAME)
    }

    /// Capitalized exercise type
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        self.exercise.exercise_type.label()
    }

    /// Capitalized status
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        self.exercise.status.label()
    }
}

/// Entry of the patient picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientChoice {
    /// Value submitted with the form
    pub id: PatientId,
    /// Label shown in the picker
    pub name: String,
}

/// Raw assignment form as typed by the clinician
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentForm {
    /// Selected patient, as submitted
    pub patient_id: String,
    /// Required
    pub title: String,
    /// Required
    pub description: String,
    /// `memory`, `attention`, `reasoning` or `language`
    pub exercise_type: String,
    /// Required
    pub instructions: String,
    /// Blank means no duration
    pub duration_minutes: String,
}

impl AssignmentForm {
    /// Check fields in form order and build the insert record
    pub fn validate(&self, clinician: UserId) -> Result<NewAssignedExercise, ClinicError> {
        let patient_id = self
            .patient_id
            .trim()
            .parse::<Uuid>()
            .map(PatientId)
            .map_err(|_| ClinicError::form("patient_id", "Select a patient"))?;
        let title = required("title", &self.title, "Title is required")?;
        let description = required("description", &self.description, "Description is required")?;
        let exercise_type = self
            .exercise_type
            .trim()
            .parse::<ExerciseType>()
            .map_err(|e| ClinicError::form("exercise_type", e.to_string()))?;
        let instructions = required("instructions", &self.instructions, "Instructions are required")?;
        let duration_minutes = parse_duration(&self.duration_minutes)?;

        Ok(NewAssignedExercise {
            patient_id,
            clinician_id: clinician,
            title,
            description,
            exercise_type,
            instructions,
            duration_minutes,
        })
    }
}

fn required(field: &'static str, value: &str, message: &str) -> Result<String, ClinicError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClinicError::form(field, message));
    }
    Ok(value.to_string())
}

fn parse_duration(raw: &str) -> Result<Option<u32>, ClinicError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<u32>() {
        Ok(minutes) if minutes > 0 => Ok(Some(minutes)),
        _ => Err(ClinicError::form(
            "duration_minutes",
            "Duration must be a positive whole number of minutes",
        )),
    }
}

#[derive(Serialize)]
struct StatusPatch {
    status: ExerciseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_date: Option<NaiveDate>,
}

/// Assignment service
#[derive(Debug, Clone)]
pub struct ExercisesService {
    store: Arc<dyn RowStore>,
}

impl ExercisesService {
    /// Service over `store`
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Assignments made by `clinician`, newest first
    pub async fn clinician_view(&self, clinician: UserId) -> Result<Vec<ExerciseRow>, ClinicError> {
        let query = Query::new()
            .eq("clinician_id", clinician)
            .order("assigned_date", false)
            .order("created_at", false);
        let exercises: Vec<AssignedExercise> = self.store.select_as(Table::AssignedExercises, &query).await?;

        let patient_ids: BTreeSet<PatientId> = exercises.iter().map(|e| e.patient_id).collect();
        let names = self.patient_names(patient_ids).await?;

        Ok(exercises
            .into_iter()
            .map(|exercise| ExerciseRow {
                patient_name: names.get(&exercise.patient_id).cloned(),
                exercise,
            })
            .collect())
    }

    /// Every patient for the assignment picker
    pub async fn patient_choices(&self) -> Result<Vec<PatientChoice>, ClinicError> {
        let patients: Vec<PatientRecord> = self.store.select_as(Table::Patients, &Query::new()).await?;
        let users: Vec<UserId> = patients.iter().filter_map(|p| p.user_id).collect();
        let names = profile_names(self.store.as_ref(), &users).await?;

        Ok(patients
            .into_iter()
            .map(|p| PatientChoice {
                id: p.id,
                name: p
                    .user_id
                    .and_then(|u| names.get(&u).cloned())
                    .unwrap_or_else(|| UNNAMED_PATIENT.to_string()),
            })
            .collect())
    }

    /// Validate and store a new pending assignment
    pub async fn assign(&self, clinician: UserId, form: &AssignmentForm) -> Result<AssignedExercise, ClinicError> {
        let record = form.validate(clinician)?;
        let stored: AssignedExercise = self.store.insert_as(Table::AssignedExercises, &record).await?;
        tracing::info!(
            exercise = %stored.id,
            patient = %stored.patient_id,
            kind = %stored.exercise_type,
            "exercise assigned"
        );
        Ok(stored)
    }

    /// Assignments of the patient behind `user`, newest first
    pub async fn patient_view(&self, user: UserId) -> Result<Vec<AssignedExercise>, ClinicError> {
        let Some(patient) = patient_for_user(self.store.as_ref(), user).await? else {
            return Ok(Vec::new());
        };
        let query = Query::new()
            .eq("patient_id", patient.id)
            .order("assigned_date", false)
            .order("created_at", false);
        Ok(self.store.select_as(Table::AssignedExercises, &query).await?)
    }

    /// Mark done, optionally with a score; stamps today's date
    pub async fn complete(&self, id: ExerciseId, score: Option<u32>) -> Result<AssignedExercise, ClinicError> {
        if score.is_some_and(|s| s > 100) {
            return Err(ClinicError::form("score", "Score must be between 0 and 100"));
        }
        let patch = StatusPatch {
            status: ExerciseStatus::Completed,
            score,
            completed_date: Some(Utc::now().date_naive()),
        };
        self.transition(id, patch).await
    }

    /// Mark skipped
    pub async fn skip(&self, id: ExerciseId) -> Result<AssignedExercise, ClinicError> {
        let patch = StatusPatch {
            status: ExerciseStatus::Skipped,
            score: None,
            completed_date: None,
        };
        self.transition(id, patch).await
    }

    async fn fetch(&self, id: ExerciseId) -> Result<AssignedExercise, ClinicError> {
        self.store
            .maybe_single(Table::AssignedExercises, Query::new().eq("id", id))
            .await?
            .ok_or(ClinicError::ExerciseNotFound(id))
    }

    async fn transition(&self, id: ExerciseId, patch: StatusPatch) -> Result<AssignedExercise, ClinicError> {
        let current = self.fetch(id).await?;
        if current.status.is_terminal() {
            return Err(ClinicError::ExerciseFinal {
                from: current.status,
                to: patch.status,
            });
        }
        let to = patch.status;
        let row = encode_row(Table::AssignedExercises, &patch)?;
        self.store
            .update(Table::AssignedExercises, row, &[Filter::eq("id", id)])
            .await?;
        tracing::info!(exercise = %id, from = %current.status, %to, "exercise status changed");
        self.fetch(id).await
    }

    async fn patient_names(
        &self,
        patients: impl IntoIterator<Item = PatientId>,
    ) -> Result<HashMap<PatientId, String>, ClinicError> {
        let ids: Vec<PatientId> = patients.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = Query::new().is_in("id", ids);
        let records: Vec<PatientRecord> = self.store.select_as(Table::Patients, &query).await?;
        let users: Vec<UserId> = records.iter().filter_map(|r| r.user_id).collect();
        let names = profile_names(self.store.as_ref(), &users).await?;

        Ok(records
            .into_iter()
            .filter_map(|r| Some((r.id, names.get(&r.user_id?)?.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form() -> AssignmentForm {
        AssignmentForm {
            patient_id: Uuid::new_v4().to_string(),
            title: " Word recall ".into(),
            description: "Recall ten words".into(),
            exercise_type: "memory".into(),
            instructions: "Read, wait, repeat".into(),
            duration_minutes: String::new(),
        }
    }

    fn field(err: ClinicError) -> &'static str {
        match err {
            ClinicError::Form { field, .. } => field,
            other => panic!("expected form error, got {other}"),
        }
    }

    #[test]
    fn valid_form_trims_and_omits_duration() {
        let clinician = UserId::new();
        let record = form().validate(clinician).unwrap();
        assert_eq!(record.title, "Word recall");
        assert_eq!(record.duration_minutes, None);
        assert_eq!(record.exercise_type, ExerciseType::Memory);
        assert_eq!(record.clinician_id, clinician);
    }

    #[test]
    fn first_failing_field_is_reported() {
        let mut f = form();
        f.patient_id.clear();
        f.title = "  ".into();
        assert_eq!(field(f.validate(UserId::new()).unwrap_err()), "patient_id");

        let mut f = form();
        f.title = "  ".into();
        f.instructions.clear();
        assert_eq!(field(f.validate(UserId::new()).unwrap_err()), "title");

        let mut f = form();
        f.exercise_type = "chess".into();
        assert_eq!(field(f.validate(UserId::new()).unwrap_err()), "exercise_type");
    }

    #[test]
    fn duration_must_be_positive_integer() {
        for bad in ["0", "-5", "ten", "2.5"] {
            let f = AssignmentForm {
                duration_minutes: bad.into(),
                ..form()
            };
            assert_eq!(field(f.validate(UserId::new()).unwrap_err()), "duration_minutes");
        }
        let f = AssignmentForm {
            duration_minutes: " 15 ".into(),
            ..form()
        };
        assert_eq!(f.validate(UserId::new()).unwrap().duration_minutes, Some(15));
    }
}
