//! Distribution ratios for allocation bases.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stratum_shared::types::{BudgetId, CostCenterId, FiscalPeriodId};

use super::error::AllocationError;
use super::types::AllocationBasis;
use crate::account::{AccountChart, AccountType};
use crate::budget::BudgetLineItem;
use crate::hierarchy::CostCenterDirectory;

/// Computes the share of a source amount that a target receives.
pub trait AllocationFactorCalculator {
    /// Returns the factor for `target` when distributing from `source`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::UnsupportedBasis` if the basis cannot be evaluated.
    fn factor(
        &self,
        source: CostCenterId,
        target: CostCenterId,
        basis: &AllocationBasis,
        fiscal_period: FiscalPeriodId,
        budget: Option<BudgetId>,
    ) -> Result<Decimal, AllocationError>;
}

/// Calculator over an in-memory snapshot of cost centers and line items.
pub struct StandardFactorCalculator<'a> {
    directory: &'a CostCenterDirectory,
    accounts: &'a AccountChart,
    items_by_cost_center: HashMap<CostCenterId, Vec<&'a BudgetLineItem>>,
    as_of: NaiveDate,
}

impl<'a> StandardFactorCalculator<'a> {
    /// Creates a calculator. Items already produced by an allocation never feed
    /// the revenue and expense bases.
    #[must_use]
    pub fn new(
        directory: &'a CostCenterDirectory,
        accounts: &'a AccountChart,
        line_items: &'a [BudgetLineItem],
        as_of: NaiveDate,
    ) -> Self {
        let mut items_by_cost_center: HashMap<CostCenterId, Vec<&BudgetLineItem>> =
            HashMap::new();
        for item in line_items.iter().filter(|i| !i.is_allocated) {
            items_by_cost_center
                .entry(item.cost_center_id)
                .or_default()
                .push(item);
        }
        Self {
            directory,
            accounts,
            items_by_cost_center,
            as_of,
        }
    }

    fn equal(&self, source: CostCenterId) -> Decimal {
        let count = self.directory.active_children(source, self.as_of).len();
        if count == 0 {
            return Decimal::ZERO;
        }
        Decimal::ONE / Decimal::from(count)
    }

    fn headcount(&self, source: CostCenterId, target: CostCenterId) -> Decimal {
        let total: Decimal = self
            .directory
            .active_children(source, self.as_of)
            .iter()
            .map(|c| c.allocation_weight)
            .sum();
        let target_value = self.directory.get(target).map(|c| c.allocation_weight);
        ratio(Some(total), target_value)
    }

    fn by_account_type(
        &self,
        source: CostCenterId,
        target: CostCenterId,
        account_type: AccountType,
        fiscal_period: FiscalPeriodId,
        budget: Option<BudgetId>,
    ) -> Decimal {
        let scope = std::iter::once(source).chain(
            self.directory
                .active_children(source, self.as_of)
                .into_iter()
                .map(|c| c.id),
        );
        let mut source_total: Option<Decimal> = None;
        for cost_center in scope {
            if let Some(sum) = self.sum_for(cost_center, account_type, fiscal_period, budget) {
                *source_total.get_or_insert(Decimal::ZERO) += sum;
            }
        }
        let target_value = self.sum_for(target, account_type, fiscal_period, budget);
        ratio(source_total, target_value)
    }

    /// Sums matching items on one cost center; None when nothing matched.
    fn sum_for(
        &self,
        cost_center: CostCenterId,
        account_type: AccountType,
        fiscal_period: FiscalPeriodId,
        budget: Option<BudgetId>,
    ) -> Option<Decimal> {
        self.items_by_cost_center
            .get(&cost_center)?
            .iter()
            .filter(|i| i.fiscal_period_id == fiscal_period)
            .filter(|i| budget.is_none_or(|b| i.budget_id == b))
            .filter(|i| self.accounts.account_type(i.gl_account_id) == Some(account_type))
            .map(|i| i.final_amount)
            .reduce(|acc, amount| acc + amount)
    }
}

/// Target over source; zero when either side is absent or the source is zero.
fn ratio(source_total: Option<Decimal>, target_value: Option<Decimal>) -> Decimal {
    match (source_total, target_value) {
        (Some(total), Some(value)) if !total.is_zero() => value / total,
        _ => Decimal::ZERO,
    }
}

impl AllocationFactorCalculator for StandardFactorCalculator<'_> {
    fn factor(
        &self,
        source: CostCenterId,
        target: CostCenterId,
        basis: &AllocationBasis,
        fiscal_period: FiscalPeriodId,
        budget: Option<BudgetId>,
    ) -> Result<Decimal, AllocationError> {
        match basis {
            AllocationBasis::Equal => Ok(self.equal(source)),
            AllocationBasis::Headcount => Ok(self.headcount(source, target)),
            AllocationBasis::Revenue => Ok(self.by_account_type(
                source,
                target,
                AccountType::Revenue,
                fiscal_period,
                budget,
            )),
            AllocationBasis::Expense => Ok(self.by_account_type(
                source,
                target,
                AccountType::Expense,
                fiscal_period,
                budget,
            )),
            AllocationBasis::FixedPercentage | AllocationBasis::Custom(_) => {
                Err(AllocationError::UnsupportedBasis {
                    basis: basis.to_string(),
                })
            }
        }
    }
}
