//! Deepest-first rollup of line items.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use stratum_shared::types::{BudgetId, CostCenterId, FiscalPeriodId, GlAccountId};
use tracing::{debug, info};

use super::elimination::EliminationMatcher;
use super::error::ConsolidationError;
use super::types::{ConsolidatedAmount, ConsolidatedKey, ConsolidationOutcome, IntercompanyPartner};
use crate::account::AccountChart;
use crate::budget::BudgetLineItem;
use crate::hierarchy::HierarchyNode;

/// Per-node running totals keyed by (account, period).
type Subtotals = BTreeMap<(GlAccountId, FiscalPeriodId), Subtotal>;

#[derive(Debug, Clone, Copy, Default)]
struct Subtotal {
    amount: Decimal,
    count: u32,
}

impl Subtotal {
    fn add(&mut self, other: Self) {
        self.amount += other.amount;
        self.count = self.count.saturating_add(other.count);
    }
}

/// Rolls budget line items up a resolved hierarchy.
pub struct ConsolidationAggregator;

impl ConsolidationAggregator {
    /// Consolidate a budget over a resolved hierarchy.
    ///
    /// Each node's subtotal is its own line items for `budget_id` plus the
    /// finalized subtotals of its direct children. Nodes are processed in
    /// descending level order, so a parent never re-derives a child's total.
    /// Line items on cost centers outside the hierarchy are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConsolidationError::DuplicateNode` if a cost center appears twice,
    /// and `ConsolidationError::ChildOutOfOrder` if a child is not deeper than its
    /// parent.
    pub fn consolidate(
        budget_id: BudgetId,
        hierarchy: &[HierarchyNode],
        line_items: &[BudgetLineItem],
        accounts: &AccountChart,
        partners: &[IntercompanyPartner],
    ) -> Result<ConsolidationOutcome, ConsolidationError> {
        let mut seen = HashSet::with_capacity(hierarchy.len());
        let mut children: HashMap<CostCenterId, Vec<CostCenterId>> = HashMap::new();
        for node in hierarchy {
            if !seen.insert(node.cost_center_id) {
                return Err(ConsolidationError::DuplicateNode(node.cost_center_id));
            }
            if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node.cost_center_id);
            }
        }

        let mut own: HashMap<CostCenterId, Subtotals> = HashMap::new();
        let mut skipped = 0usize;
        for item in line_items.iter().filter(|i| i.budget_id == budget_id) {
            if !seen.contains(&item.cost_center_id) {
                skipped += 1;
                continue;
            }
            own.entry(item.cost_center_id)
                .or_default()
                .entry((item.gl_account_id, item.fiscal_period_id))
                .or_default()
                .add(Subtotal {
                    amount: item.final_amount,
                    count: 1,
                });
        }

        let own_amounts: HashMap<ConsolidatedKey, Decimal> = own
            .iter()
            .flat_map(|(cost_center_id, totals)| {
                totals.iter().map(|((gl_account_id, fiscal_period_id), subtotal)| {
                    (
                        ConsolidatedKey::new(*gl_account_id, *cost_center_id, *fiscal_period_id),
                        subtotal.amount,
                    )
                })
            })
            .collect();

        let mut order: Vec<&HierarchyNode> = hierarchy.iter().collect();
        order.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.sort_key.cmp(&b.sort_key)));
        let rollup: Vec<(CostCenterId, &[CostCenterId])> = order
            .iter()
            .map(|node| {
                let direct = children
                    .get(&node.cost_center_id)
                    .map_or(&[][..], Vec::as_slice);
                (node.cost_center_id, direct)
            })
            .collect();

        let mut finalized: HashMap<CostCenterId, Subtotals> = HashMap::with_capacity(order.len());
        for node in order {
            let mut totals = own.remove(&node.cost_center_id).unwrap_or_default();

            for child in children.get(&node.cost_center_id).into_iter().flatten() {
                let child_totals =
                    finalized
                        .get(child)
                        .ok_or(ConsolidationError::ChildOutOfOrder {
                            parent: node.cost_center_id,
                            child: *child,
                        })?;
                for (key, subtotal) in child_totals {
                    totals.entry(*key).or_default().add(*subtotal);
                }
            }

            debug!(
                cost_center = %node.cost_center_id,
                level = node.level,
                keys = totals.len(),
                "rolled up cost center"
            );
            finalized.insert(node.cost_center_id, totals);
        }

        let mut amounts = BTreeMap::new();
        for (cost_center_id, totals) in finalized {
            for ((gl_account_id, fiscal_period_id), subtotal) in totals {
                let key = ConsolidatedKey::new(gl_account_id, cost_center_id, fiscal_period_id);
                amounts.insert(key, ConsolidatedAmount::new(key, subtotal.amount, subtotal.count));
            }
        }

        let unreconciled =
            EliminationMatcher::new(accounts, partners).apply(&mut amounts, &own_amounts, &rollup);

        info!(
            budget = %budget_id,
            rows = amounts.len(),
            skipped_items = skipped,
            unreconciled = unreconciled.len(),
            "consolidated budget"
        );

        Ok(ConsolidationOutcome {
            amounts,
            unreconciled,
        })
    }
}
