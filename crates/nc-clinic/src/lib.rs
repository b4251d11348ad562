//! NeuralCare clinic services
//!
//! Screen-level services over the row store:
//! - [`dashboard`]: KPI averages over a time window plus latest insights
//! - [`history`]: assessment results with trends
//! - [`patients`]: clinician patient list with search and risk filter
//! - [`exercises`]: assignment, completion and skipping of exercises
//! - [`signup`]: registration form rules
//! - [`assessment`]: runs a test session and records the score
//!
//! # Example
//!
//! ```rust,ignore
//! use nc_clinic::{DashboardService, TimeRange};
//!
//! # async fn example(store: std::sync::Arc<dyn nc_core::RowStore>, user: nc_core::UserId) -> Result<(), nc_clinic::ClinicError> {
//! let dashboard = DashboardService::new(store, Default::default())
//!     .load(user, Some(nc_core::Role::Patient), TimeRange::Month)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

pub mod assessment;
pub mod dashboard;
pub mod error;
pub mod exercises;
pub mod history;
pub mod patients;
pub mod signup;
pub mod stubs;
pub mod tone;

pub use assessment::AssessmentHost;
pub use dashboard::{Dashboard, DashboardService, DashboardStats, InsightCard, TimeRange};
pub use error::ClinicError;
pub use exercises::{AssignmentForm, ExerciseRow, ExercisesService, PatientChoice};
pub use history::{trends, HistoryRow, HistoryService, Trend};
pub use patients::{PatientFilter, PatientRow, PatientsService, RiskFilter};
pub use signup::{submit, SignupError, SignupForm, SignupSuccess};
pub use stubs::{admin_settings, generate_report, Notice};
pub use tone::Tone;
