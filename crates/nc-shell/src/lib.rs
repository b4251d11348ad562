//! NeuralCare navigation shell
//!
//! Resolves identity and role once per session and gates screens on them:
//! - [`session`]: explicit session context with a resolved flag
//! - [`guard`]: loading / redirect / render decisions
//! - [`menu`]: role-conditioned sidebar
//! - [`routes`]: route table with allowed roles

#![allow(missing_docs)]

pub mod error;
pub mod guard;
pub mod menu;
pub mod navigator;
pub mod routes;
pub mod session;
pub mod shell;

pub use error::ShellError;
pub use guard::{decide, GuardDecision};
pub use menu::{menu_for, MenuItem};
pub use navigator::{HistoryNavigator, Navigator};
pub use routes::{Access, Route};
pub use session::{Session, SessionManager, SessionState};
pub use shell::{Shell, SignOutReport};
