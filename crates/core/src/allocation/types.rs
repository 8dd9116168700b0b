//! Allocation data types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratum_shared::types::{
    AllocationRuleId, CostCenterId, FiscalPeriodId, GlAccountId, LineItemId,
};
use thiserror::Error;

/// How a rule relates to the rest of the rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Straight distribution from source to targets.
    Direct,
    /// Distribution sequenced after the rule it depends on.
    StepDown,
    /// Mutual distribution between service departments.
    Reciprocal,
    /// Distribution driven by activity measures.
    ActivityBased,
}

/// Which line items a rule draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSelector {
    /// Every line item on one cost center.
    CostCenter {
        /// Source cost center.
        cost_center_id: CostCenterId,
    },
    /// Line items whose codes match SQL `LIKE` patterns (`%` and `_`).
    Pattern {
        /// Pattern over the cost-center code.
        #[serde(default)]
        cost_center_code: Option<String>,
        /// Pattern over the GL account code.
        #[serde(default)]
        account_code: Option<String>,
    },
}

/// Method used to compute a distribution ratio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AllocationBasis {
    /// Share of direct-children allocation weights.
    Headcount,
    /// Share of revenue-account amounts.
    Revenue,
    /// Share of expense-account amounts.
    Expense,
    /// Equal split across active direct children.
    Equal,
    /// Percentages carried on each target.
    FixedPercentage,
    /// A basis defined outside the engine.
    Custom(String),
}

impl AllocationBasis {
    /// Returns the canonical code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Headcount => "HEADCOUNT",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
            Self::Equal => "EQUAL",
            Self::FixedPercentage => "FIXED_PERCENTAGE",
            Self::Custom(code) => code,
        }
    }
}

impl FromStr for AllocationBasis {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Ok(match code.as_str() {
            "HEADCOUNT" => Self::Headcount,
            "REVENUE" => Self::Revenue,
            "EXPENSE" => Self::Expense,
            "EQUAL" => Self::Equal,
            "FIXED_PERCENTAGE" | "PERCENTAGE" | "FIXED" => Self::FixedPercentage,
            _ => Self::Custom(code),
        })
    }
}

impl From<String> for AllocationBasis {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(basis) => basis,
            Err(never) => match never {},
        }
    }
}

impl From<AllocationBasis> for String {
    fn from(value: AllocationBasis) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AllocationBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounding applied to each allocated amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMethod {
    /// Half away from zero.
    #[default]
    Nearest,
    /// Toward positive infinity.
    Up,
    /// Toward negative infinity.
    Down,
    /// Leave unrounded.
    None,
}

/// Reference to a target cost center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRef {
    /// By ID.
    Id(CostCenterId),
    /// By code.
    Code(String),
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => f.write_str(code),
        }
    }
}

/// A receiver of a rule's distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTarget {
    /// Target cost center.
    pub cost_center: TargetRef,
    /// Fixed share in percent (0-100); overrides the rule basis.
    #[serde(default)]
    pub fixed_percentage: Option<Decimal>,
    /// Evaluation order (lower first).
    #[serde(default)]
    pub priority: i32,
    /// Opaque conditions carried for collaborators.
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
}

/// A policy distributing amounts from a source to targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRule {
    /// Rule ID.
    pub id: AllocationRuleId,
    /// Rule name.
    pub name: String,
    /// Rule type.
    pub rule_type: RuleType,
    /// Source selector.
    pub source: SourceSelector,
    /// Allocation basis.
    pub basis: AllocationBasis,
    /// Rounding method.
    #[serde(default)]
    pub rounding: RoundingMethod,
    /// Fractional digits kept by rounding.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Tie-break ordering between rules.
    #[serde(default)]
    pub execution_sequence: i32,
    /// Rule that must finish first.
    #[serde(default)]
    pub depends_on: Option<AllocationRuleId>,
    /// Whether the rule runs at all.
    pub is_active: bool,
    /// First day the rule applies.
    pub effective_from: NaiveDate,
    /// First day the rule no longer applies.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Allocations smaller than this (in absolute value) are suppressed.
    #[serde(default)]
    pub minimum_amount: Option<Decimal>,
    /// Explicit targets; empty means the source's active direct children.
    #[serde(default)]
    pub targets: Vec<AllocationTarget>,
}

fn default_precision() -> u32 {
    2
}

impl AllocationRule {
    /// Returns true if the rule is active and effective on `as_of`.
    #[must_use]
    pub fn applies_on(&self, as_of: NaiveDate) -> bool {
        self.is_active
            && self.effective_from <= as_of
            && self.effective_to.is_none_or(|to| as_of < to)
    }
}

/// One allocated amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Line item the amount was drawn from.
    pub source_line_item_id: LineItemId,
    /// Cost center the amount was drawn from.
    pub source_cost_center_id: CostCenterId,
    /// Receiving cost center.
    pub target_cost_center_id: CostCenterId,
    /// Receiving GL account.
    pub target_gl_account_id: GlAccountId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Allocated amount after rounding.
    pub allocated_amount: Decimal,
    /// Applied share in percent.
    pub applied_percentage: Decimal,
    /// Rule that produced the amount.
    pub rule_id: AllocationRuleId,
    /// Wavefront pass that produced the amount.
    pub iteration: u32,
}

/// Completion record for a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRuleRecord {
    /// Rule ID.
    pub rule_id: AllocationRuleId,
    /// Sum of allocated amounts.
    pub total_allocated: Decimal,
    /// Distinct target cost centers.
    pub target_count: u32,
    /// Line items fully allocated.
    pub items_processed: u32,
    /// Pass in which the rule completed.
    pub completed_iteration: u32,
}

/// Non-fatal conditions raised during allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationWarning {
    /// Rule dependencies form a cycle; members run without a dependency.
    #[error("Rule dependency cycle detected: {}", format_cycle(.cycle))]
    CycleDetected {
        /// Rules on the cycle, starting from the smallest ID.
        cycle: Vec<AllocationRuleId>,
    },

    /// The calculator could not evaluate the rule basis.
    #[error("Rule {rule_id} uses unsupported basis {basis} for line item {line_item_id}")]
    UnsupportedBasis {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Line item left unprocessed.
        line_item_id: LineItemId,
        /// Basis code.
        basis: String,
    },

    /// The rule's source selector could not be compiled.
    #[error("Rule {rule_id} has an invalid source selector: {reason}")]
    InvalidSelector {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Reason.
        reason: String,
    },

    /// A target names no known cost center.
    #[error("Rule {rule_id} target {target} does not resolve to a cost center")]
    UnresolvedTarget {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Target as given.
        target: String,
    },

    /// The item's rule waits on a rule that never completes.
    #[error(
        "Unsatisfiable dependency: rule {rule_id} waits on {depends_on} (line item {line_item_id})"
    )]
    UnsatisfiableDependency {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Dependency that never completed.
        depends_on: AllocationRuleId,
        /// Line item left unprocessed.
        line_item_id: LineItemId,
    },

    /// The pass cap was reached with the item still pending.
    #[error(
        "Iteration limit {max_iterations} reached before rule {rule_id} processed line item {line_item_id}"
    )]
    IterationLimitReached {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Line item left unprocessed.
        line_item_id: LineItemId,
        /// Configured cap.
        max_iterations: u32,
    },

    /// An allocated amount fell below the rule minimum.
    #[error("Rule {rule_id} suppressed {amount} to {target_cost_center_id}: below minimum {minimum}")]
    BelowMinimum {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Source line item.
        line_item_id: LineItemId,
        /// Target that would have received the amount.
        target_cost_center_id: CostCenterId,
        /// Suppressed amount.
        amount: Decimal,
        /// Rule minimum.
        minimum: Decimal,
    },

    /// Applying the factor to the item's amount overflows the decimal range.
    #[error("Rule {rule_id} cannot allocate {amount} from line item {line_item_id}: amount overflow")]
    AmountOverflow {
        /// Rule ID.
        rule_id: AllocationRuleId,
        /// Line item left unprocessed.
        line_item_id: LineItemId,
        /// Source amount.
        amount: Decimal,
    },

    /// The item's fiscal period no longer accepts allocations.
    #[error("Fiscal period {fiscal_period_id} is closed; line item {line_item_id} not allocated")]
    PeriodClosed {
        /// Line item excluded.
        line_item_id: LineItemId,
        /// Closed period.
        fiscal_period_id: FiscalPeriodId,
    },
}

fn format_cycle(cycle: &[AllocationRuleId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl AllocationWarning {
    /// Returns the warning code used in run summaries.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::UnsupportedBasis { .. } => "UNSUPPORTED_BASIS",
            Self::InvalidSelector { .. } => "INVALID_SELECTOR",
            Self::UnresolvedTarget { .. } => "UNRESOLVED_TARGET",
            Self::UnsatisfiableDependency { .. } => "UNSATISFIABLE_DEPENDENCY",
            Self::IterationLimitReached { .. } => "ITERATION_LIMIT_EXCEEDED",
            Self::BelowMinimum { .. } => "BELOW_MINIMUM",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
        }
    }
}

/// Everything an allocation pass hands back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Allocated amounts in the order they were produced.
    pub results: Vec<AllocationResult>,
    /// Non-fatal conditions.
    pub warnings: Vec<AllocationWarning>,
    /// Rules that completed, in completion order.
    pub processed_rules: Vec<ProcessedRuleRecord>,
    /// Wavefront passes executed.
    pub iterations: u32,
    /// Work items left unprocessed.
    pub unprocessed_items: usize,
}

impl AllocationOutcome {
    /// Returns the completion record for a rule.
    #[must_use]
    pub fn record_for(&self, rule_id: AllocationRuleId) -> Option<&ProcessedRuleRecord> {
        self.processed_rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Returns the results produced by a rule.
    pub fn results_for(&self, rule_id: AllocationRuleId) -> impl Iterator<Item = &AllocationResult> {
        self.results.iter().filter(move |r| r.rule_id == rule_id)
    }
}
