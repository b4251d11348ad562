//! NeuralCare sequence-memory assessment
//!
//! Implements the color-sequence recall test:
//! - [`engine`]: synchronous state machine (intro, memorize, recall, result)
//! - [`driver`]: tokio task scheduling playback and retry timers
//! - [`sequence`]: injectable sequence generators
//! - [`simulator`]: seeded simulated players with invariant checks
//!
//! # Example
//!
//! ```rust,ignore
//! use nc_cogtest::{driver, ChannelObserver, SequenceTest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), nc_cogtest::DriverError> {
//! let (observer, mut outcomes) = ChannelObserver::new();
//! let (handle, task) = driver::spawn(SequenceTest::seeded(7), Default::default(), Arc::new(observer));
//! handle.start().await?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

pub mod driver;
pub mod engine;
pub mod error;
pub mod sequence;
pub mod simulator;

pub use driver::{ChannelObserver, DriverExit, DriverHandle, DriverTask, TestObserver, TestOutcome, TestView};
pub use engine::{
    confirmation_score, termination_score, Ending, InputOutcome, Phase, SequenceTest, SessionId, TestSnapshot,
    TestSummary,
};
pub use error::{DriverError, TestError};
pub use sequence::{Color, RandomSequence, ScriptedSequence, SequenceGenerator};
pub use simulator::{run_simulator, SimulatorConfig, SimulatorReport};

/// Test type recorded in `test_results` rows
pub const TEST_TYPE: &str = "sequence_memory";
