//! GL account types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use stratum_shared::types::GlAccountId;

/// Account classification.
///
/// Each type carries a one-letter code used by allocation bases:
/// asset `A`, liability `L`, equity `E`, revenue `R`, expense `X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Asset account.
    Asset,
    /// Liability account.
    Liability,
    /// Equity account.
    Equity,
    /// Revenue account.
    Revenue,
    /// Expense account.
    Expense,
}

impl AccountType {
    /// Returns the one-letter type code.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Asset => 'A',
            Self::Liability => 'L',
            Self::Equity => 'E',
            Self::Revenue => 'R',
            Self::Expense => 'X',
        }
    }

    /// Parses a one-letter type code.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'A' => Some(Self::Asset),
            'L' => Some(Self::Liability),
            'E' => Some(Self::Equity),
            'R' => Some(Self::Revenue),
            'X' => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A general-ledger account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlAccount {
    /// Account ID.
    pub id: GlAccountId,
    /// Account code (unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether balances on this account are intercompany.
    #[serde(default)]
    pub is_intercompany: bool,
    /// Partner account that intercompany balances eliminate against.
    #[serde(default)]
    pub consolidation_account_id: Option<GlAccountId>,
    /// Whether the account accepts budget amounts.
    #[serde(default = "default_budgetable")]
    pub is_budgetable: bool,
}

fn default_budgetable() -> bool {
    true
}

impl GlAccount {
    /// Returns the partner account when this account takes part in elimination.
    #[must_use]
    pub fn elimination_partner(&self) -> Option<GlAccountId> {
        if self.is_intercompany {
            self.consolidation_account_id
        } else {
            None
        }
    }
}

/// Lookup table over the chart of accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountChart {
    by_id: HashMap<GlAccountId, GlAccount>,
    by_code: HashMap<String, GlAccountId>,
}

impl AccountChart {
    /// Builds a chart from account rows. Later rows win on duplicate ids.
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = GlAccount>) -> Self {
        let mut chart = Self::default();
        for account in accounts {
            chart.by_code.insert(account.code.clone(), account.id);
            chart.by_id.insert(account.id, account);
        }
        chart
    }

    /// Returns the account with the given ID.
    #[must_use]
    pub fn get(&self, id: GlAccountId) -> Option<&GlAccount> {
        self.by_id.get(&id)
    }

    /// Returns the account with the given code.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&GlAccount> {
        self.by_code.get(code).and_then(|id| self.by_id.get(id))
    }

    /// Returns the type of the given account, if known.
    #[must_use]
    pub fn account_type(&self, id: GlAccountId) -> Option<AccountType> {
        self.by_id.get(&id).map(|a| a.account_type)
    }

    /// Returns the number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the chart has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
