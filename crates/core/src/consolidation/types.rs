//! Consolidation data types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratum_shared::types::{CostCenterId, FiscalPeriodId, GlAccountId};

/// Key of a consolidated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConsolidatedKey {
    /// GL account.
    pub gl_account_id: GlAccountId,
    /// Cost center.
    pub cost_center_id: CostCenterId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
}

impl ConsolidatedKey {
    /// Creates a new key.
    #[must_use]
    pub const fn new(
        gl_account_id: GlAccountId,
        cost_center_id: CostCenterId,
        fiscal_period_id: FiscalPeriodId,
    ) -> Self {
        Self {
            gl_account_id,
            cost_center_id,
            fiscal_period_id,
        }
    }
}

/// A consolidated amount for one (account, cost center, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedAmount {
    /// Row key.
    pub key: ConsolidatedKey,
    /// Own amounts plus rolled-up children.
    pub consolidated_amount: Decimal,
    /// Intercompany offset.
    pub elimination_amount: Decimal,
    /// Consolidated minus elimination.
    pub final_amount: Decimal,
    /// Number of line items that contributed.
    pub source_count: u32,
}

impl ConsolidatedAmount {
    /// Creates a row with no elimination.
    #[must_use]
    pub fn new(key: ConsolidatedKey, consolidated_amount: Decimal, source_count: u32) -> Self {
        Self {
            key,
            consolidated_amount,
            elimination_amount: Decimal::ZERO,
            final_amount: consolidated_amount,
            source_count,
        }
    }

    /// Sets the elimination amount and recomputes the final amount.
    pub fn apply_elimination(&mut self, elimination: Decimal) {
        self.elimination_amount = elimination;
        self.final_amount = self.consolidated_amount - elimination;
    }
}

/// Designates the intercompany counterparty of a cost center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntercompanyPartner {
    /// Cost center holding the intercompany balance.
    pub cost_center_id: CostCenterId,
    /// Counterparty cost center.
    pub partner_cost_center_id: CostCenterId,
}

/// Why an intercompany row was left unreconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreconciledReason {
    /// The cost center has no designated partner.
    NoPartner,
    /// The partner has no row for the partner account in this period.
    Unmatched,
    /// Both sides carry the same sign.
    SameSign,
}

impl UnreconciledReason {
    /// Returns the reason as a snake_case string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoPartner => "no_partner",
            Self::Unmatched => "unmatched",
            Self::SameSign => "same_sign",
        }
    }
}

/// An intercompany row that could not be eliminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreconciledIntercompany {
    /// Row key.
    pub key: ConsolidatedKey,
    /// Consolidated amount left in place.
    pub amount: Decimal,
    /// Reason no elimination was applied.
    pub reason: UnreconciledReason,
}

/// Result of consolidating one budget.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationOutcome {
    /// One row per key.
    pub amounts: BTreeMap<ConsolidatedKey, ConsolidatedAmount>,
    /// Intercompany rows left for external reconciliation.
    pub unreconciled: Vec<UnreconciledIntercompany>,
}

impl ConsolidationOutcome {
    /// Returns the row for a key.
    #[must_use]
    pub fn get(&self, key: &ConsolidatedKey) -> Option<&ConsolidatedAmount> {
        self.amounts.get(key)
    }

    /// Consumes the outcome, returning rows in key order.
    #[must_use]
    pub fn into_rows(self) -> Vec<ConsolidatedAmount> {
        self.amounts.into_values().collect()
    }

    /// Iterates over rows in key order.
    pub fn rows(&self) -> impl Iterator<Item = &ConsolidatedAmount> {
        self.amounts.values()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Sum of final amounts for one cost center across accounts and periods.
    #[must_use]
    pub fn total_for(&self, cost_center_id: CostCenterId) -> Decimal {
        self.amounts
            .values()
            .filter(|a| a.key.cost_center_id == cost_center_id)
            .map(|a| a.final_amount)
            .sum()
    }
}
