//! Run orchestration.
//!
//! A run validates the budget, takes the budget's exclusive lock, then
//! resolves the hierarchy, consolidates and allocates. Results are buffered
//! and returned only from a completed run.

pub mod engine;
pub mod error;
pub mod types;


pub use engine::{RunEngine, step};
pub use error::RunError;
pub use types::{
    RunOptions, RunOutcome, RunRequest, RunStatus, RunSummary, StepStatus, StepSummary,
    StepWarning,
};
