//! Key-based intercompany elimination.
//!
//! A row is matched against its counterparty by (partner account, partner cost
//! center, same period). Row order plays no part in matching. Ancestors without
//! a partner designation inherit the eliminations of their children, so a
//! matched pair nets out at every level above it.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use stratum_shared::types::{CostCenterId, FiscalPeriodId, GlAccountId};
use tracing::{debug, warn};

use super::types::{
    ConsolidatedAmount, ConsolidatedKey, IntercompanyPartner, UnreconciledIntercompany,
    UnreconciledReason,
};
use crate::account::AccountChart;

/// Eliminations of one cost center keyed by (account, period).
type NodeEliminations = BTreeMap<(GlAccountId, FiscalPeriodId), Decimal>;

/// Matches intercompany rows against their counterparties.
pub struct EliminationMatcher<'a> {
    accounts: &'a AccountChart,
    partners: HashMap<CostCenterId, CostCenterId>,
}

impl<'a> EliminationMatcher<'a> {
    /// Creates a matcher. Partner designations apply in both directions unless a
    /// cost center has its own explicit designation.
    #[must_use]
    pub fn new(accounts: &'a AccountChart, partners: &[IntercompanyPartner]) -> Self {
        let mut map = HashMap::with_capacity(partners.len() * 2);
        for p in partners {
            map.insert(p.cost_center_id, p.partner_cost_center_id);
        }
        for p in partners {
            map.entry(p.partner_cost_center_id)
                .or_insert(p.cost_center_id);
        }
        Self {
            accounts,
            partners: map,
        }
    }

    /// Returns true if the cost center has a designated partner.
    #[must_use]
    pub fn has_partner(&self, cost_center_id: CostCenterId) -> bool {
        self.partners.contains_key(&cost_center_id)
    }

    /// Computes the elimination for two opposing amounts.
    ///
    /// Returns the signed portion of `own` offset by `partner`, or None when the
    /// amounts do not carry opposite signs.
    #[must_use]
    pub fn offset(own: Decimal, partner: Decimal) -> Option<Decimal> {
        if own.is_zero() || partner.is_zero() || own.is_sign_negative() == partner.is_sign_negative()
        {
            return None;
        }
        let magnitude = own.abs().min(partner.abs());
        Some(if own.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        })
    }

    /// Applies eliminations in place and returns the rows left unreconciled.
    ///
    /// `own` holds each row's amount from its own line items, before rollup.
    /// `rollup` lists cost centers deepest first with their direct children.
    ///
    /// Rows of designated cost centers are matched on pre-elimination
    /// consolidated amounts, so the result does not depend on visiting order.
    /// Every other row takes the sum of its children's eliminations for the
    /// same account and period. An intercompany row with no designation is
    /// reported only for the part that came from its own line items; rolled-up
    /// amounts were already judged at the cost center they came from.
    pub fn apply(
        &self,
        amounts: &mut BTreeMap<ConsolidatedKey, ConsolidatedAmount>,
        own: &HashMap<ConsolidatedKey, Decimal>,
        rollup: &[(CostCenterId, &[CostCenterId])],
    ) -> Vec<UnreconciledIntercompany> {
        let mut direct: HashMap<CostCenterId, NodeEliminations> = HashMap::new();
        let mut unreconciled = Vec::new();

        for (key, row) in amounts.iter() {
            let Some(partner_account) = self
                .accounts
                .get(key.gl_account_id)
                .and_then(|a| a.elimination_partner())
            else {
                continue;
            };

            let reported = match self.partners.get(&key.cost_center_id) {
                None => own
                    .get(key)
                    .filter(|amount| !amount.is_zero())
                    .map(|amount| (UnreconciledReason::NoPartner, *amount)),
                Some(&partner_cc) => {
                    let partner_key =
                        ConsolidatedKey::new(partner_account, partner_cc, key.fiscal_period_id);
                    let reason = match amounts.get(&partner_key) {
                        None => Some(UnreconciledReason::Unmatched),
                        Some(partner_row) => match Self::offset(
                            row.consolidated_amount,
                            partner_row.consolidated_amount,
                        ) {
                            Some(elimination) => {
                                direct
                                    .entry(key.cost_center_id)
                                    .or_default()
                                    .insert((key.gl_account_id, key.fiscal_period_id), elimination);
                                None
                            }
                            None if row.consolidated_amount.is_zero() => None,
                            None if partner_row.consolidated_amount.is_zero() => {
                                Some(UnreconciledReason::Unmatched)
                            }
                            None => Some(UnreconciledReason::SameSign),
                        },
                    };
                    reason.map(|r| (r, row.consolidated_amount))
                }
            };

            if let Some((reason, amount)) = reported {
                warn!(
                    account = %key.gl_account_id,
                    cost_center = %key.cost_center_id,
                    period = %key.fiscal_period_id,
                    %amount,
                    ?reason,
                    "intercompany amount left unreconciled"
                );
                unreconciled.push(UnreconciledIntercompany {
                    key: *key,
                    amount,
                    reason,
                });
            }
        }

        let mut rolled: HashMap<CostCenterId, NodeEliminations> =
            HashMap::with_capacity(rollup.len());
        for &(cost_center_id, children) in rollup {
            let totals = if self.has_partner(cost_center_id) {
                direct.remove(&cost_center_id).unwrap_or_default()
            } else {
                let mut totals = NodeEliminations::new();
                for child in children {
                    for (key, elimination) in rolled.get(child).into_iter().flatten() {
                        *totals.entry(*key).or_default() += *elimination;
                    }
                }
                totals
            };
            if !totals.is_empty() {
                debug!(
                    cost_center = %cost_center_id,
                    keys = totals.len(),
                    "eliminations rolled up"
                );
            }
            rolled.insert(cost_center_id, totals);
        }

        for (cost_center_id, totals) in rolled {
            for ((gl_account_id, fiscal_period_id), elimination) in totals {
                let key = ConsolidatedKey::new(gl_account_id, cost_center_id, fiscal_period_id);
                if let Some(row) = amounts.get_mut(&key) {
                    row.apply_elimination(elimination);
                }
            }
        }

        unreconciled
    }
}
