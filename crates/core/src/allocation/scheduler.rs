//! Wavefront allocation scheduler.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stratum_shared::types::{AllocationRuleId, BudgetId, CostCenterId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dependency::{DEFAULT_CYCLE_GUARD_DEPTH, DependencyGraph};
use super::error::AllocationError;
use super::factor::AllocationFactorCalculator;
use super::selector::CompiledSelector;
use super::types::{
    AllocationOutcome, AllocationResult, AllocationRule, AllocationWarning, ProcessedRuleRecord,
    TargetRef,
};
use crate::account::AccountChart;
use crate::budget::BudgetLineItem;
use crate::hierarchy::CostCenterDirectory;

/// Default cap on wavefront passes.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Scheduler settings.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Cap on wavefront passes.
    pub max_iterations: u32,
    /// Bound on the dependency walk.
    pub cycle_guard_depth: u32,
    /// Date used for rule and cost-center effectiveness.
    pub as_of: NaiveDate,
    /// Restrict source items to one budget.
    pub budget_id: Option<BudgetId>,
}

impl SchedulerOptions {
    /// Creates options with default limits.
    #[must_use]
    pub const fn new(as_of: NaiveDate) -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            cycle_guard_depth: DEFAULT_CYCLE_GUARD_DEPTH,
            as_of,
            budget_id: None,
        }
    }

    /// Sets the pass cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the dependency walk bound.
    #[must_use]
    pub const fn with_cycle_guard_depth(mut self, depth: u32) -> Self {
        self.cycle_guard_depth = depth;
        self
    }

    /// Restricts source items to one budget.
    #[must_use]
    pub const fn with_budget(mut self, budget_id: BudgetId) -> Self {
        self.budget_id = Some(budget_id);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedTarget {
    cost_center_id: CostCenterId,
    fixed_percentage: Option<Decimal>,
}

struct PreparedRule<'r> {
    rule: &'r AllocationRule,
    selector: CompiledSelector,
    explicit_targets: bool,
    targets: Vec<ResolvedTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkState {
    Pending,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct WorkItem {
    rule: usize,
    item: usize,
    state: WorkState,
}

#[derive(Debug, Default)]
struct RuleProgress {
    pending: usize,
    total: Decimal,
    targets: HashSet<CostCenterId>,
    items: u32,
    completed: Option<u32>,
}

/// Drives allocation rules over source line items in dependency order.
pub struct AllocationScheduler<'a> {
    directory: &'a CostCenterDirectory,
    accounts: &'a AccountChart,
    options: SchedulerOptions,
}

impl<'a> AllocationScheduler<'a> {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new(
        directory: &'a CostCenterDirectory,
        accounts: &'a AccountChart,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            directory,
            accounts,
            options,
        }
    }

    /// Allocates source line items according to `rules`.
    ///
    /// Each pass processes every pending work item whose rule has no pending
    /// dependency. A rule completes once its dependency is satisfied and none of
    /// its items is pending. The loop stops when a pass could advance nothing or
    /// the pass cap is reached; leftover items are reported as warnings.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::Cancelled` if `cancel` fires between passes.
    pub fn allocate(
        &self,
        rules: &[AllocationRule],
        source_line_items: &[BudgetLineItem],
        calculator: &dyn AllocationFactorCalculator,
        cancel: &CancellationToken,
    ) -> Result<AllocationOutcome, AllocationError> {
        let mut warnings = Vec::new();
        let prepared = self.prepare(rules, &mut warnings);

        let graph = DependencyGraph::build(
            prepared.iter().map(|p| (p.rule.id, p.rule.depends_on)),
            self.options.cycle_guard_depth,
        );
        for cycle in graph.cycles() {
            let warning = AllocationWarning::CycleDetected {
                cycle: cycle.clone(),
            };
            warn!(rules = cycle.len(), "{warning}");
            warnings.push(warning);
        }

        let (mut work, mut progress) = self.queue(&prepared, source_line_items);

        let mut results = Vec::new();
        let mut processed: HashSet<AllocationRuleId> = HashSet::new();
        let mut completion_order = Vec::new();
        let mut iteration = 0u32;
        let mut limit_reached = false;

        loop {
            let ready: Vec<bool> = prepared
                .iter()
                .map(|p| {
                    graph
                        .effective_dependency(p.rule.id)
                        .is_none_or(|dep| processed.contains(&dep))
                })
                .collect();

            let has_items = work
                .iter()
                .any(|w| w.state == WorkState::Pending && ready[w.rule]);
            let has_completions = progress
                .iter()
                .enumerate()
                .any(|(r, p)| ready[r] && p.completed.is_none() && p.pending == 0);
            if !has_items && !has_completions {
                break;
            }
            if iteration >= self.options.max_iterations {
                limit_reached = true;
                break;
            }
            if cancel.is_cancelled() {
                info!(iteration, "allocation cancelled");
                return Err(AllocationError::Cancelled { iteration });
            }
            iteration += 1;

            let mut advanced = 0usize;
            for w in work
                .iter_mut()
                .filter(|w| w.state == WorkState::Pending && ready[w.rule])
            {
                let rule = &prepared[w.rule];
                let item = &source_line_items[w.item];
                let state = &mut progress[w.rule];
                state.pending -= 1;
                advanced += 1;

                let allocated = self
                    .allocate_item(rule, item, calculator, iteration)
                    .and_then(|(item_results, notes)| {
                        item_results
                            .iter()
                            .try_fold(state.total, |acc, r| acc.checked_add(r.allocated_amount))
                            .map(|total| (item_results, notes, total))
                            .ok_or_else(|| overflow(rule.rule.id, item))
                    });
                match allocated {
                    Ok((item_results, notes, total)) => {
                        state.total = total;
                        for result in &item_results {
                            state.targets.insert(result.target_cost_center_id);
                        }
                        state.items = state.items.saturating_add(1);
                        results.extend(item_results);
                        warnings.extend(notes);
                        w.state = WorkState::Done;
                    }
                    Err(warning) => {
                        warn!(rule = %rule.rule.id, line_item = %item.id, "{warning}");
                        warnings.push(warning);
                        w.state = WorkState::Failed;
                    }
                }
            }

            for (r, state) in progress.iter_mut().enumerate() {
                if ready[r] && state.completed.is_none() && state.pending == 0 {
                    state.completed = Some(iteration);
                    processed.insert(prepared[r].rule.id);
                    completion_order.push(r);
                }
            }

            debug!(
                iteration,
                advanced,
                processed_rules = processed.len(),
                "allocation pass complete"
            );
        }

        let mut unprocessed_items = 0usize;
        for w in work.iter().filter(|w| w.state == WorkState::Pending) {
            unprocessed_items += 1;
            let rule = prepared[w.rule].rule;
            let line_item_id = source_line_items[w.item].id;
            let warning = match graph.effective_dependency(rule.id) {
                Some(depends_on) if !limit_reached => AllocationWarning::UnsatisfiableDependency {
                    rule_id: rule.id,
                    depends_on,
                    line_item_id,
                },
                _ => AllocationWarning::IterationLimitReached {
                    rule_id: rule.id,
                    line_item_id,
                    max_iterations: self.options.max_iterations,
                },
            };
            warn!(rule = %rule.id, line_item = %line_item_id, "{warning}");
            warnings.push(warning);
        }

        let processed_rules: Vec<ProcessedRuleRecord> = completion_order
            .into_iter()
            .map(|r| {
                let state = &progress[r];
                ProcessedRuleRecord {
                    rule_id: prepared[r].rule.id,
                    total_allocated: state.total,
                    target_count: u32::try_from(state.targets.len()).unwrap_or(u32::MAX),
                    items_processed: state.items,
                    completed_iteration: state.completed.unwrap_or(iteration),
                }
            })
            .collect();

        info!(
            rules = prepared.len(),
            work_items = work.len(),
            results = results.len(),
            warnings = warnings.len(),
            iterations = iteration,
            unprocessed = unprocessed_items,
            "allocation finished"
        );

        Ok(AllocationOutcome {
            results,
            warnings,
            processed_rules,
            iterations: iteration,
            unprocessed_items,
        })
    }

    /// Keeps rules that apply on the run date, compiles selectors and resolves
    /// explicit targets. Rules come back ordered by execution sequence then ID.
    fn prepare<'r>(
        &self,
        rules: &'r [AllocationRule],
        warnings: &mut Vec<AllocationWarning>,
    ) -> Vec<PreparedRule<'r>> {
        let mut active: Vec<&AllocationRule> = rules
            .iter()
            .filter(|rule| {
                let applies = rule.applies_on(self.options.as_of);
                if !applies {
                    debug!(rule = %rule.id, "rule inactive on run date");
                }
                applies
            })
            .collect();
        active.sort_by(|a, b| {
            a.execution_sequence
                .cmp(&b.execution_sequence)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut prepared = Vec::with_capacity(active.len());
        for rule in active {
            let selector = match CompiledSelector::compile(&rule.source) {
                Ok(selector) => selector,
                Err(err) => {
                    let warning = AllocationWarning::InvalidSelector {
                        rule_id: rule.id,
                        reason: err.to_string(),
                    };
                    warn!(rule = %rule.id, "{warning}");
                    warnings.push(warning);
                    continue;
                }
            };

            let mut resolved = Vec::with_capacity(rule.targets.len());
            for target in &rule.targets {
                let center = match &target.cost_center {
                    TargetRef::Id(id) => self.directory.get(*id),
                    TargetRef::Code(code) => self.directory.find_by_code(code),
                };
                match center {
                    Some(center) => resolved.push((
                        target.priority,
                        center.code.as_str(),
                        ResolvedTarget {
                            cost_center_id: center.id,
                            fixed_percentage: target.fixed_percentage,
                        },
                    )),
                    None => {
                        let warning = AllocationWarning::UnresolvedTarget {
                            rule_id: rule.id,
                            target: target.cost_center.to_string(),
                        };
                        warn!(rule = %rule.id, "{warning}");
                        warnings.push(warning);
                    }
                }
            }
            resolved.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

            prepared.push(PreparedRule {
                rule,
                selector,
                explicit_targets: !rule.targets.is_empty(),
                targets: resolved.into_iter().map(|(_, _, t)| t).collect(),
            });
        }
        prepared
    }

    /// Pairs each rule with the source items it draws from.
    fn queue(
        &self,
        prepared: &[PreparedRule<'_>],
        items: &[BudgetLineItem],
    ) -> (Vec<WorkItem>, Vec<RuleProgress>) {
        let mut eligible: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_allocated)
            .filter(|(_, item)| self.options.budget_id.is_none_or(|b| item.budget_id == b))
            .map(|(i, _)| i)
            .collect();
        eligible.sort_by_key(|&i| items[i].id);

        let mut work = Vec::new();
        let mut progress: Vec<RuleProgress> =
            prepared.iter().map(|_| RuleProgress::default()).collect();
        for (r, rule) in prepared.iter().enumerate() {
            for &i in &eligible {
                if rule.selector.matches(&items[i], self.directory, self.accounts) {
                    work.push(WorkItem {
                        rule: r,
                        item: i,
                        state: WorkState::Pending,
                    });
                    progress[r].pending += 1;
                }
            }
        }
        (work, progress)
    }

    /// Allocates one source item across the rule's targets.
    ///
    /// Either every target is evaluated or the item fails as a whole.
    fn allocate_item(
        &self,
        prepared: &PreparedRule<'_>,
        item: &BudgetLineItem,
        calculator: &dyn AllocationFactorCalculator,
        iteration: u32,
    ) -> Result<(Vec<AllocationResult>, Vec<AllocationWarning>), AllocationWarning> {
        let rule = prepared.rule;
        let defaults: Vec<ResolvedTarget>;
        let targets = if prepared.explicit_targets {
            &prepared.targets
        } else {
            defaults = self
                .directory
                .active_children(item.cost_center_id, self.options.as_of)
                .into_iter()
                .map(|c| ResolvedTarget {
                    cost_center_id: c.id,
                    fixed_percentage: None,
                })
                .collect();
            &defaults
        };

        let mut results = Vec::with_capacity(targets.len());
        let mut notes = Vec::new();
        for target in targets {
            let factor = match target.fixed_percentage {
                Some(pct) => pct / Decimal::ONE_HUNDRED,
                None => calculator
                    .factor(
                        item.cost_center_id,
                        target.cost_center_id,
                        &rule.basis,
                        item.fiscal_period_id,
                        Some(item.budget_id),
                    )
                    .map_err(|err| {
                        debug!(error = %err, rule = %rule.id, "factor unavailable");
                        AllocationWarning::UnsupportedBasis {
                            rule_id: rule.id,
                            line_item_id: item.id,
                            basis: rule.basis.to_string(),
                        }
                    })?,
            };

            let raw = item
                .final_amount
                .checked_mul(factor)
                .ok_or_else(|| overflow(rule.id, item))?;
            let amount = rule.rounding.apply(raw, rule.precision);
            if amount.is_zero() {
                continue;
            }
            if let Some(minimum) = rule.minimum_amount
                && amount.abs() < minimum
            {
                notes.push(AllocationWarning::BelowMinimum {
                    rule_id: rule.id,
                    line_item_id: item.id,
                    target_cost_center_id: target.cost_center_id,
                    amount,
                    minimum,
                });
                continue;
            }

            results.push(AllocationResult {
                source_line_item_id: item.id,
                source_cost_center_id: item.cost_center_id,
                target_cost_center_id: target.cost_center_id,
                target_gl_account_id: item.gl_account_id,
                fiscal_period_id: item.fiscal_period_id,
                allocated_amount: amount,
                applied_percentage: factor
                    .checked_mul(Decimal::ONE_HUNDRED)
                    .ok_or_else(|| overflow(rule.id, item))?
                    .round_dp(6),
                rule_id: rule.id,
                iteration,
            });
        }

        Ok((results, notes))
    }
}

fn overflow(rule_id: AllocationRuleId, item: &BudgetLineItem) -> AllocationWarning {
    AllocationWarning::AmountOverflow {
        rule_id,
        line_item_id: item.id,
        amount: item.final_amount,
    }
}
