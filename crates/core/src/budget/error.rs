//! Budget error types.

use stratum_shared::types::{BudgetId, FiscalPeriodId};
use thiserror::Error;

use super::types::BudgetStatus;

/// Budget-related errors.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Budget is not in a state that permits consolidation.
    #[error("Budget {id} is {status} and cannot be consolidated")]
    NotConsolidatable {
        /// Budget ID.
        id: BudgetId,
        /// Current status.
        status: BudgetStatus,
    },

    /// Fiscal period not found.
    #[error("Fiscal period not found: {0}")]
    FiscalPeriodNotFound(FiscalPeriodId),

    /// Fiscal period lies outside the budget's period range.
    #[error("Fiscal period {0} is outside the budget period range")]
    PeriodOutsideBudget(FiscalPeriodId),
}
