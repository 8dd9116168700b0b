//! Budget validation performed before a run touches any data.

use super::error::BudgetError;
use super::types::Budget;
use crate::fiscal::FiscalPeriod;

/// Budget service for business logic.
pub struct BudgetService;

impl BudgetService {
    /// Validate that the budget may be consolidated.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NotConsolidatable` unless the budget is approved or locked.
    pub fn ensure_consolidatable(budget: &Budget) -> Result<(), BudgetError> {
        if budget.status.permits_consolidation() {
            Ok(())
        } else {
            Err(BudgetError::NotConsolidatable {
                id: budget.id,
                status: budget.status,
            })
        }
    }

    /// Validate that a fiscal period lies inside the budget's period range.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::PeriodOutsideBudget` if the period starts before the
    /// budget or ends after it.
    pub fn ensure_period_in_range(budget: &Budget, period: &FiscalPeriod) -> Result<(), BudgetError> {
        if period.start_date >= budget.period_start && period.end_date <= budget.period_end {
            Ok(())
        } else {
            Err(BudgetError::PeriodOutsideBudget(period.id))
        }
    }
}
