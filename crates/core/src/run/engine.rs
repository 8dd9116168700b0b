//! End-to-end run: validate, lock, resolve, consolidate, allocate.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::Utc;
use stratum_shared::EngineConfig;
use stratum_shared::types::{AllocationRuleId, BudgetId, FiscalPeriodId, RunId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::RunError;
use super::types::{RunOutcome, RunRequest, RunStatus, RunSummary, StepSummary, StepWarning};
use crate::account::AccountChart;
use crate::allocation::{
    AllocationRule, AllocationScheduler, AllocationWarning, CompiledSelector, SchedulerOptions,
    StandardFactorCalculator,
};
use crate::budget::{BudgetError, BudgetLineItem, BudgetService};
use crate::consolidation::ConsolidationAggregator;
use crate::fiscal::FiscalPeriod;
use crate::hierarchy::{CostCenterDirectory, HierarchyResolver, ResolveOptions};
use crate::lock::{LockMode, RunLockRegistry};

/// Step names used in run summaries.
pub mod step {
    /// Hierarchy resolution.
    pub const RESOLVE: &str = "resolve_hierarchy";
    /// Bottom-up consolidation.
    pub const CONSOLIDATE: &str = "consolidate";
    /// Rule-driven allocation.
    pub const ALLOCATE: &str = "allocate";
}

/// Runs consolidation and allocation for one budget at a time per resource.
#[derive(Debug, Clone)]
pub struct RunEngine {
    config: EngineConfig,
    locks: RunLockRegistry,
}

impl RunEngine {
    /// Creates an engine. Engines sharing a registry serialize runs over the
    /// same budget.
    #[must_use]
    pub const fn new(config: EngineConfig, locks: RunLockRegistry) -> Self {
        Self { config, locks }
    }

    /// Returns the lock registry.
    #[must_use]
    pub const fn locks(&self) -> &RunLockRegistry {
        &self.locks
    }

    /// Returns the lock resource name for a budget.
    #[must_use]
    pub fn lock_key(budget_id: BudgetId) -> String {
        format!("budget:{budget_id}")
    }

    /// Executes a run.
    ///
    /// Validation happens before the lock is taken and before any step runs.
    /// The lock is held until every step has finished or failed.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Budget` for an ineligible budget or period,
    /// `RunError::Lock` if the budget is locked by another run for longer than
    /// the configured timeout, and the step error of any step that fails.
    pub async fn execute(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let run_id = RunId::new();
        let budget = &request.budget;
        let options = &request.options;

        info!(run = %run_id, budget = %budget.id, "run started");
        BudgetService::ensure_consolidatable(budget)?;
        let periods = Self::select_periods(request)?;

        let resource = Self::lock_key(budget.id);
        let lease = self
            .locks
            .acquire(
                &resource,
                LockMode::Exclusive,
                Duration::from_secs(self.config.lock_timeout_secs),
            )
            .await?;

        let as_of = options.as_of.unwrap_or(budget.period_start);
        let in_scope: Vec<BudgetLineItem> = request
            .line_items
            .iter()
            .filter(|i| i.budget_id == budget.id && periods.contains_key(&i.fiscal_period_id))
            .cloned()
            .collect();
        debug!(
            run = %run_id,
            items = in_scope.len(),
            skipped = request.line_items.len() - in_scope.len(),
            periods = periods.len(),
            "line items scoped"
        );

        let mut steps = Vec::with_capacity(3);

        let step_started = Instant::now();
        let directory = CostCenterDirectory::new(request.cost_centers.iter().cloned());
        let mut resolve_options = ResolveOptions::new(as_of)
            .with_max_depth(self.config.max_depth)
            .include_inactive(options.include_inactive);
        if let Some(root) = options.root {
            resolve_options = resolve_options.with_root(root);
        }
        let hierarchy = HierarchyResolver::resolve(&directory, &resolve_options)?;
        steps.push(StepSummary::new(
            step::RESOLVE,
            hierarchy.len(),
            Vec::new(),
            elapsed_ms(step_started),
        ));

        let step_started = Instant::now();
        let accounts = AccountChart::new(request.accounts.iter().cloned());
        let mut consolidation = ConsolidationAggregator::consolidate(
            budget.id,
            &hierarchy,
            &in_scope,
            &accounts,
            &request.partners,
        )?;
        steps.push(StepSummary::new(
            step::CONSOLIDATE,
            consolidation.len(),
            consolidation.unreconciled.iter().map(StepWarning::from).collect(),
            elapsed_ms(step_started),
        ));

        let step_started = Instant::now();
        let rules = select_rules(&request.rules, options.rules.as_deref());
        let selectors: Vec<CompiledSelector> = rules
            .iter()
            .filter(|r| r.applies_on(as_of))
            .filter_map(|r| CompiledSelector::compile(&r.source).ok())
            .collect();
        let mut closed_warnings = Vec::new();
        let sources: Vec<BudgetLineItem> = in_scope
            .iter()
            .filter(|item| {
                let open = periods
                    .get(&item.fiscal_period_id)
                    .is_some_and(|p| p.accepts_allocations());
                if !open
                    && !item.is_allocated
                    && selectors
                        .iter()
                        .any(|s| s.matches(item, &directory, &accounts))
                {
                    closed_warnings.push(AllocationWarning::PeriodClosed {
                        line_item_id: item.id,
                        fiscal_period_id: item.fiscal_period_id,
                    });
                }
                open
            })
            .cloned()
            .collect();

        let calculator = StandardFactorCalculator::new(&directory, &accounts, &in_scope, as_of);
        let scheduler_options = SchedulerOptions::new(as_of)
            .with_max_iterations(self.config.max_iterations)
            .with_cycle_guard_depth(self.config.cycle_guard_depth)
            .with_budget(budget.id);
        let mut allocation = AllocationScheduler::new(&directory, &accounts, scheduler_options)
            .allocate(&rules, &sources, &calculator, cancel)?;
        if !closed_warnings.is_empty() {
            closed_warnings.append(&mut allocation.warnings);
            allocation.warnings = closed_warnings;
        }
        steps.push(StepSummary::new(
            step::ALLOCATE,
            allocation.results.len(),
            allocation.warnings.iter().map(StepWarning::from).collect(),
            elapsed_ms(step_started),
        ));

        self.locks.release(lease);

        let status = if steps.iter().all(|s| s.warnings.is_empty()) {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithWarnings
        };
        let summary = RunSummary {
            run_id,
            budget_id: budget.id,
            status,
            started_at,
            duration_ms: elapsed_ms(started),
            steps,
        };
        info!(
            run = %run_id,
            ?status,
            nodes = hierarchy.len(),
            consolidated = consolidation.len(),
            allocations = allocation.results.len(),
            warnings = allocation.warnings.len(),
            duration_ms = summary.duration_ms,
            "run completed"
        );

        let unreconciled = std::mem::take(&mut consolidation.unreconciled);
        Ok(RunOutcome {
            summary,
            hierarchy,
            unreconciled,
            consolidated: consolidation.into_rows(),
            allocation,
        })
    }

    /// Picks the periods in scope and checks each against the budget.
    fn select_periods(
        request: &RunRequest,
    ) -> Result<HashMap<FiscalPeriodId, &FiscalPeriod>, BudgetError> {
        let known: HashMap<FiscalPeriodId, &FiscalPeriod> =
            request.fiscal_periods.iter().map(|p| (p.id, p)).collect();

        let selected: Vec<&FiscalPeriod> = match &request.options.periods {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    known
                        .get(id)
                        .copied()
                        .ok_or(BudgetError::FiscalPeriodNotFound(*id))
                })
                .collect::<Result<_, _>>()?,
            None => request.fiscal_periods.iter().collect(),
        };

        for period in &selected {
            BudgetService::ensure_period_in_range(&request.budget, period)?;
        }
        debug!(selected = selected.len(), "fiscal periods validated");
        Ok(selected.into_iter().map(|p| (p.id, p)).collect())
    }
}

fn select_rules(rules: &[AllocationRule], filter: Option<&[AllocationRuleId]>) -> Vec<AllocationRule> {
    match filter {
        None => rules.to_vec(),
        Some(ids) => {
            let wanted: HashSet<_> = ids.iter().collect();
            rules
                .iter()
                .filter(|r| wanted.contains(&r.id))
                .cloned()
                .collect()
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
