//! Budget data types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratum_shared::types::{BudgetId, CostCenterId, FiscalPeriodId, GlAccountId, LineItemId};

/// Budget lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    /// Being drafted.
    Draft,
    /// Submitted for approval.
    Submitted,
    /// Approved; may be consolidated.
    Approved,
    /// Locked; may be consolidated, no edits.
    Locked,
    /// Rejected.
    Rejected,
}

impl BudgetStatus {
    /// Returns true if consolidation is permitted in this status.
    #[must_use]
    pub const fn permits_consolidation(self) -> bool {
        matches!(self, Self::Approved | Self::Locked)
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Locked => write!(f, "LOCKED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A budget header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    /// Budget ID.
    pub id: BudgetId,
    /// Budget name.
    pub name: String,
    /// Currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: BudgetStatus,
    /// First day covered by the budget.
    pub period_start: NaiveDate,
    /// Last day covered by the budget (inclusive).
    pub period_end: NaiveDate,
}

/// An immutable budget fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLineItem {
    /// Line item ID.
    pub id: LineItemId,
    /// Owning budget.
    pub budget_id: BudgetId,
    /// GL account.
    pub gl_account_id: GlAccountId,
    /// Cost center.
    pub cost_center_id: CostCenterId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Final amount (signed).
    pub final_amount: Decimal,
    /// Whether this amount is itself the output of an allocation.
    #[serde(default)]
    pub is_allocated: bool,
}
