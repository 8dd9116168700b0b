//! Property-based tests for the allocation scheduler.
//!
//! - Property 1: Dependencies complete strictly before their dependents
//! - Property 2: Equal splits conserve the source amount
//! - Property 3: Arbitrary dependency graphs within the guard depth never stall

use chrono::NaiveDate;
use proptest::prelude::*;
use proptest::sample::Index;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stratum_shared::types::{
    AllocationRuleId, BudgetId, CostCenterId, FiscalPeriodId, GlAccountId, LineItemId,
};
use tokio_util::sync::CancellationToken;

use super::factor::StandardFactorCalculator;
use super::scheduler::{AllocationScheduler, SchedulerOptions};
use super::types::{
    AllocationBasis, AllocationOutcome, AllocationRule, RoundingMethod, RuleType, SourceSelector,
};
use crate::account::{AccountChart, AccountType, GlAccount};
use crate::budget::BudgetLineItem;
use crate::hierarchy::{CostCenter, CostCenterDirectory};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn center(code: &str, parent: Option<CostCenterId>) -> CostCenter {
    CostCenter {
        id: CostCenterId::new(),
        code: code.to_string(),
        name: code.to_string(),
        parent_id: parent,
        is_active: true,
        effective_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        effective_to: None,
        allocation_weight: dec!(1),
    }
}

/// Runs `rules.len()` EQUAL rules over a source with two children.
///
/// `deps[i]` picks the rule that rule `i` depends on, if any.
fn run(deps: &[Option<usize>], amounts: &[Decimal]) -> (Vec<AllocationRule>, AllocationOutcome) {
    let source = center("SRC", None);
    let source_id = source.id;
    let dir = CostCenterDirectory::new([
        center("SRC-A", Some(source_id)),
        center("SRC-B", Some(source_id)),
        source,
    ]);
    let rent = GlAccount {
        id: GlAccountId::new(),
        code: "6100".to_string(),
        name: "Rent".to_string(),
        account_type: AccountType::Expense,
        is_intercompany: false,
        consolidation_account_id: None,
        is_budgetable: true,
    };
    let rent_id = rent.id;
    let accounts = AccountChart::new([rent]);

    let budget = BudgetId::new();
    let period = FiscalPeriodId::new();
    let items: Vec<BudgetLineItem> = amounts
        .iter()
        .map(|amount| BudgetLineItem {
            id: LineItemId::new(),
            budget_id: budget,
            gl_account_id: rent_id,
            cost_center_id: source_id,
            fiscal_period_id: period,
            final_amount: *amount,
            is_allocated: false,
        })
        .collect();

    let ids: Vec<AllocationRuleId> = deps.iter().map(|_| AllocationRuleId::new()).collect();
    let rules: Vec<AllocationRule> = deps
        .iter()
        .enumerate()
        .map(|(i, dep)| AllocationRule {
            id: ids[i],
            name: format!("rule-{i}"),
            rule_type: RuleType::StepDown,
            source: SourceSelector::CostCenter {
                cost_center_id: source_id,
            },
            basis: AllocationBasis::Equal,
            rounding: RoundingMethod::None,
            precision: 2,
            execution_sequence: 0,
            depends_on: dep.map(|d| ids[d]),
            is_active: true,
            effective_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            effective_to: None,
            minimum_amount: None,
            targets: vec![],
        })
        .collect();

    let calculator = StandardFactorCalculator::new(&dir, &accounts, &items, as_of());
    let outcome = AllocationScheduler::new(&dir, &accounts, SchedulerOptions::new(as_of()))
        .allocate(&rules, &items, &calculator, &CancellationToken::new())
        .unwrap();
    (rules, outcome)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 1: In an acyclic rule set, every rule completes exactly one
    /// pass after the rule it depends on.
    #[test]
    fn prop_dependencies_complete_first(
        picks in prop::collection::vec(prop::option::of(any::<Index>()), 1..10),
        amounts in prop::collection::vec(positive_amount(), 1..4),
    ) {
        let deps: Vec<Option<usize>> = picks
            .iter()
            .enumerate()
            .map(|(i, pick)| if i == 0 { None } else { pick.map(|p| p.index(i)) })
            .collect();

        let (rules, outcome) = run(&deps, &amounts);

        prop_assert!(outcome.warnings.is_empty());
        prop_assert_eq!(outcome.processed_rules.len(), rules.len());
        for (i, rule) in rules.iter().enumerate() {
            let done = outcome.record_for(rule.id).unwrap().completed_iteration;
            match deps[i] {
                None => prop_assert_eq!(done, 1),
                Some(d) => {
                    let dep_done = outcome.record_for(rules[d].id).unwrap().completed_iteration;
                    prop_assert_eq!(done, dep_done + 1);
                }
            }
        }
    }

    /// Property 2: Each unrounded equal split allocates exactly the source total.
    #[test]
    fn prop_equal_split_conserves_amount(
        rule_count in 1usize..4,
        amounts in prop::collection::vec(positive_amount(), 1..6),
    ) {
        let deps = vec![None; rule_count];
        let (rules, outcome) = run(&deps, &amounts);

        let expected: Decimal = amounts.iter().copied().sum();
        for rule in &rules {
            let record = outcome.record_for(rule.id).unwrap();
            prop_assert_eq!(record.total_allocated, expected);
            prop_assert_eq!(record.target_count, 2);
            prop_assert_eq!(record.items_processed as usize, amounts.len());
        }
        prop_assert_eq!(outcome.results.len(), rule_count * amounts.len() * 2);
    }

    /// Property 3: Any dependency graph small enough for the cycle guard
    /// processes every work item.
    #[test]
    fn prop_small_graphs_never_stall(
        picks in prop::collection::vec(prop::option::of(any::<Index>()), 1..8),
    ) {
        let n = picks.len();
        let deps: Vec<Option<usize>> = picks.iter().map(|p| p.map(|p| p.index(n))).collect();

        let (rules, outcome) = run(&deps, &[dec!(100)]);

        prop_assert_eq!(outcome.unprocessed_items, 0);
        prop_assert_eq!(outcome.processed_rules.len(), rules.len());
        prop_assert!(outcome.iterations as usize <= rules.len());
    }
}
