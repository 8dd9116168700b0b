//! Run request and summary types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stratum_shared::types::{AllocationRuleId, BudgetId, CostCenterId, FiscalPeriodId, RunId};

use crate::account::GlAccount;
use crate::allocation::{AllocationOutcome, AllocationRule, AllocationWarning};
use crate::budget::{Budget, BudgetLineItem};
use crate::consolidation::{ConsolidatedAmount, IntercompanyPartner, UnreconciledIntercompany};
use crate::fiscal::FiscalPeriod;
use crate::hierarchy::{CostCenter, HierarchyNode};

/// Caller-supplied filters for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Resolve only the subtree under this cost center.
    #[serde(default)]
    pub root: Option<CostCenterId>,
    /// Restrict the run to these periods.
    #[serde(default)]
    pub periods: Option<Vec<FiscalPeriodId>>,
    /// Restrict allocation to these rules.
    #[serde(default)]
    pub rules: Option<Vec<AllocationRuleId>>,
    /// Effectiveness date; defaults to the budget start.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Keep inactive cost centers in the hierarchy.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Everything one run needs, held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Budget header.
    pub budget: Budget,
    /// Fiscal periods of the budget.
    #[serde(default)]
    pub fiscal_periods: Vec<FiscalPeriod>,
    /// Cost centers.
    #[serde(default)]
    pub cost_centers: Vec<CostCenter>,
    /// GL accounts.
    #[serde(default)]
    pub accounts: Vec<GlAccount>,
    /// Budget line items.
    #[serde(default)]
    pub line_items: Vec<BudgetLineItem>,
    /// Allocation rules.
    #[serde(default)]
    pub rules: Vec<AllocationRule>,
    /// Intercompany partner designations.
    #[serde(default)]
    pub partners: Vec<IntercompanyPartner>,
    /// Filters.
    #[serde(default)]
    pub options: RunOptions,
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Every step finished without warnings.
    Completed,
    /// Every step finished; at least one raised warnings.
    CompletedWithWarnings,
}

/// Status of one run step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Finished without warnings.
    Completed,
    /// Finished with warnings.
    CompletedWithWarnings,
}

/// A warning raised by a run step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWarning {
    /// Machine-readable code, e.g. `PERIOD_CLOSED`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl From<&AllocationWarning> for StepWarning {
    fn from(warning: &AllocationWarning) -> Self {
        Self {
            code: warning.code().to_string(),
            message: warning.to_string(),
        }
    }
}

impl From<&UnreconciledIntercompany> for StepWarning {
    fn from(row: &UnreconciledIntercompany) -> Self {
        Self {
            code: "UNRECONCILED_INTERCOMPANY".to_string(),
            message: format!(
                "Intercompany amount {} on account {} at cost center {} in period {} left unreconciled ({})",
                row.amount,
                row.key.gl_account_id,
                row.key.cost_center_id,
                row.key.fiscal_period_id,
                row.reason.as_str()
            ),
        }
    }
}

/// Summary of one run step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    /// Step name.
    pub name: String,
    /// Step status.
    pub status: StepStatus,
    /// Rows produced.
    pub rows: usize,
    /// Warnings raised, in the order they occurred.
    pub warnings: Vec<StepWarning>,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
}

impl StepSummary {
    pub(crate) fn new(
        name: &str,
        rows: usize,
        warnings: Vec<StepWarning>,
        duration_ms: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            status: if warnings.is_empty() {
                StepStatus::Completed
            } else {
                StepStatus::CompletedWithWarnings
            },
            rows,
            warnings,
            duration_ms,
        }
    }
}

/// Structured record of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run ID.
    pub run_id: RunId,
    /// Budget the run covered.
    pub budget_id: BudgetId,
    /// Overall status.
    pub status: RunStatus,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
    /// Steps in execution order.
    pub steps: Vec<StepSummary>,
}

impl RunSummary {
    /// Returns the step with the given name.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepSummary> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Everything a run hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run summary.
    pub summary: RunSummary,
    /// Resolved hierarchy.
    pub hierarchy: Vec<HierarchyNode>,
    /// Consolidated rows in key order.
    pub consolidated: Vec<ConsolidatedAmount>,
    /// Intercompany rows left unreconciled.
    pub unreconciled: Vec<UnreconciledIntercompany>,
    /// Allocation results, warnings and rule records.
    pub allocation: AllocationOutcome,
}
