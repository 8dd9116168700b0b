//! Rule-driven redistribution of budget amounts.
//!
//! Rules are ordered by their dependencies and executed in waves: each pass
//! processes every work item whose rule has nothing left to wait on. Factors
//! come from an [`AllocationFactorCalculator`], so callers can plug in their
//! own bases.

pub mod dependency;
pub mod error;
pub mod factor;
pub mod rounding;
pub mod scheduler;
pub mod selector;
pub mod types;

#[cfg(test)]
mod scheduler_props;

pub use dependency::{DEFAULT_CYCLE_GUARD_DEPTH, DependencyGraph};
pub use error::AllocationError;
pub use factor::{AllocationFactorCalculator, StandardFactorCalculator};
pub use scheduler::{AllocationScheduler, DEFAULT_MAX_ITERATIONS, SchedulerOptions};
pub use selector::CompiledSelector;
pub use types::{
    AllocationBasis, AllocationOutcome, AllocationResult, AllocationRule, AllocationTarget,
    AllocationWarning, ProcessedRuleRecord, RoundingMethod, RuleType, SourceSelector, TargetRef,
};
