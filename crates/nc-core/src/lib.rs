//! NeuralCare Core
//!
//! Shared foundation for the NeuralCare workspace:
//! - Typed records for every backend table
//! - The row-store and identity seams to the hosted backend
//! - An in-memory backend for tests, demos and the CLI
//! - Application configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use nc_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = std::sync::Arc::new(MemoryStore::new());
//! let results: Vec<TestResult> = store
//!     .select_as(Table::TestResults, &Query::new().order("date", false).limit(5))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod identity;
pub mod memory;
pub mod store;
pub mod types;

pub use config::{AppConfig, DashboardConfig, TestRules, TimingConfig};
pub use error::{AuthError, ConfigError, ParseEnumError, StoreError};
pub use identity::{IdentityService, MemoryIdentity, SignUpMetadata, SignUpRequest, User};
pub use memory::MemoryStore;
pub use store::{Filter, FilterOp, Order, Query, Row, RowStore, RowStoreExt, Table};
pub use types::{
    AssignedExercise, ExerciseId, ExerciseStatus, ExerciseType, Insight, Measurement,
    NewAssignedExercise, NewInsight, NewMeasurement, NewPatient, NewTestResult, PatientId,
    PatientRecord, Profile, RiskLevel, Role, Severity, Sex, TestResult, UserId, UserRoleRecord,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with NeuralCare records
    pub use crate::{
        AppConfig, IdentityService, MemoryIdentity, MemoryStore, PatientId, Query, Role,
        RowStore, RowStoreExt, Table, TestResult, User, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
