//! Run error types.

use stratum_shared::AppError;
use thiserror::Error;

use crate::allocation::AllocationError;
use crate::budget::BudgetError;
use crate::consolidation::ConsolidationError;
use crate::hierarchy::HierarchyError;
use crate::lock::LockError;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The budget or its periods failed validation.
    #[error(transparent)]
    Budget(#[from] BudgetError),

    /// The run lock was not obtained.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The hierarchy could not be resolved.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Consolidation rejected its input.
    #[error(transparent)]
    Consolidation(#[from] ConsolidationError),

    /// Allocation stopped.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

impl From<RunError> for AppError {
    fn from(err: RunError) -> Self {
        let message = err.to_string();
        match err {
            RunError::Budget(BudgetError::FiscalPeriodNotFound(_))
            | RunError::Hierarchy(HierarchyError::RootNotFound(_)) => Self::NotFound(message),
            RunError::Budget(_) | RunError::Consolidation(_) => Self::Validation(message),
            RunError::Lock(LockError::Timeout { .. }) => Self::LockTimeout(message),
            RunError::Allocation(AllocationError::Cancelled { .. }) => Self::Cancelled(message),
            RunError::Allocation(_) => Self::Internal(message),
        }
    }
}
