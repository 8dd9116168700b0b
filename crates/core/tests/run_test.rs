//! End-to-end run tests.
//!
//! These tests verify that:
//! - The Region-West scenario splits rent equally across both stores
//! - Runs over the same budget wait for each other through the run lock
//! - Runs over different budgets do not wait for each other
//! - Intercompany balances are eliminated at the consolidated level

#![allow(clippy::items_after_statements)]

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use stratum_core::account::{AccountType, GlAccount};
use stratum_core::budget::BudgetLineItem;
use stratum_core::consolidation::IntercompanyPartner;
use stratum_core::lock::{LockMode, RunLockRegistry};
use stratum_core::run::{RunEngine, RunRequest, RunStatus, step};
use stratum_shared::EngineConfig;
use stratum_shared::types::{BudgetId, CostCenterId, GlAccountId, LineItemId};

const SCENARIO: &str = include_str!("../../../demos/region_west.json");

fn region_west() -> RunRequest {
    serde_json::from_str(SCENARIO).unwrap()
}

fn engine(locks: &RunLockRegistry) -> RunEngine {
    RunEngine::new(EngineConfig::default(), locks.clone())
}

fn cost_center_id(request: &RunRequest, code: &str) -> CostCenterId {
    request
        .cost_centers
        .iter()
        .find(|c| c.code == code)
        .map(|c| c.id)
        .unwrap()
}

#[tokio::test]
async fn test_region_west_equal_split() {
    let request = region_west();
    let region = cost_center_id(&request, "RW");
    let store_a = cost_center_id(&request, "RW-A");
    let store_b = cost_center_id(&request, "RW-B");

    let outcome = engine(&RunLockRegistry::new())
        .execute(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.summary.status, RunStatus::Completed);

    let results = &outcome.allocation.results;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].target_cost_center_id, store_a);
    assert_eq!(results[1].target_cost_center_id, store_b);
    for result in results {
        assert_eq!(result.allocated_amount, dec!(5000.00));
        assert_eq!(result.source_cost_center_id, region);
        assert_eq!(result.iteration, 1);
    }

    let rule_id = request.rules[0].id;
    let record = outcome.allocation.record_for(rule_id).unwrap();
    assert_eq!(record.target_count, 2);
    assert_eq!(record.total_allocated, dec!(10000));

    let region_total: Decimal = outcome
        .consolidated
        .iter()
        .filter(|row| row.key.cost_center_id == region)
        .map(|row| row.final_amount)
        .sum();
    assert_eq!(region_total, dec!(10000));
}

#[tokio::test]
async fn test_summary_json_shape() {
    let outcome = engine(&RunLockRegistry::new())
        .execute(&region_west(), &CancellationToken::new())
        .await
        .unwrap();

    let json = serde_json::to_value(&outcome.summary).unwrap();
    assert_eq!(json["status"], "COMPLETED");
    let steps: Vec<&str> = json["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(steps, vec![step::RESOLVE, step::CONSOLIDATE, step::ALLOCATE]);
}

#[tokio::test]
async fn test_same_budget_waits_for_lock() {
    let locks = RunLockRegistry::new();
    let request = region_west();
    let held = locks
        .acquire(
            &RunEngine::lock_key(request.budget.id),
            LockMode::Exclusive,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let run = {
        let engine = engine(&locks);
        tokio::spawn(async move { engine.execute(&request, &CancellationToken::new()).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!run.is_finished());

    drop(held);
    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.allocation.results.len(), 2);
}

#[tokio::test]
async fn test_other_budget_does_not_wait() {
    let locks = RunLockRegistry::new();
    let _held = locks
        .acquire(
            &RunEngine::lock_key(BudgetId::new()),
            LockMode::Exclusive,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        engine(&locks).execute(&region_west(), &CancellationToken::new()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(outcome.summary.status, RunStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_all_complete() {
    let locks = RunLockRegistry::new();
    let request = region_west();
    let key = RunEngine::lock_key(request.budget.id);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let engine = engine(&locks);
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            engine.execute(&request, &CancellationToken::new()).await
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.allocation.results.len(), 2);
    }
    assert!(!locks.is_held(&key));
}

#[tokio::test]
async fn test_intercompany_eliminated_at_parent() {
    let mut request = region_west();
    let region = cost_center_id(&request, "RW");
    let store_a = cost_center_id(&request, "RW-A");
    let store_b = cost_center_id(&request, "RW-B");
    let period = request.fiscal_periods[0].id;

    let receivable_id = GlAccountId::new();
    let payable_id = GlAccountId::new();
    let ic = |id: GlAccountId, code: &str, account_type, partner: GlAccountId| GlAccount {
        id,
        code: code.to_string(),
        name: code.to_string(),
        account_type,
        is_intercompany: true,
        consolidation_account_id: Some(partner),
        is_budgetable: true,
    };
    request.accounts.push(ic(
        receivable_id,
        "1300",
        AccountType::Asset,
        payable_id,
    ));
    request.accounts.push(ic(
        payable_id,
        "2300",
        AccountType::Liability,
        receivable_id,
    ));

    let line = |account, cost_center, amount| BudgetLineItem {
        id: LineItemId::new(),
        budget_id: request.budget.id,
        gl_account_id: account,
        cost_center_id: cost_center,
        fiscal_period_id: period,
        final_amount: amount,
        is_allocated: false,
    };
    let receivable = line(receivable_id, store_a, dec!(300));
    let payable = line(payable_id, store_b, dec!(-200));
    request.line_items.push(receivable);
    request.line_items.push(payable);
    request.partners.push(IntercompanyPartner {
        cost_center_id: store_a,
        partner_cost_center_id: store_b,
    });

    let outcome = engine(&RunLockRegistry::new())
        .execute(&request, &CancellationToken::new())
        .await
        .unwrap();

    let row = |account: GlAccountId, cost_center: CostCenterId| {
        outcome
            .consolidated
            .iter()
            .find(|r| r.key.gl_account_id == account && r.key.cost_center_id == cost_center)
            .unwrap()
    };
    let a = row(receivable_id, store_a);
    assert_eq!(a.elimination_amount, dec!(200));
    assert_eq!(a.final_amount, dec!(100));
    let b = row(payable_id, store_b);
    assert_eq!(b.elimination_amount, dec!(-200));
    assert_eq!(b.final_amount, Decimal::ZERO);

    let region_receivable = row(receivable_id, region);
    assert_eq!(region_receivable.consolidated_amount, dec!(300));
    assert_eq!(region_receivable.elimination_amount, dec!(200));
    assert_eq!(region_receivable.final_amount, dec!(100));
    assert_eq!(row(payable_id, region).final_amount, Decimal::ZERO);

    assert!(outcome.unreconciled.is_empty());
    assert_eq!(outcome.summary.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_inactive_store_excluded() {
    let mut request = region_west();
    let store_b = cost_center_id(&request, "RW-B");
    for center in &mut request.cost_centers {
        if center.id == store_b {
            center.effective_to = NaiveDate::from_ymd_opt(2025, 1, 1);
        }
    }

    let outcome = engine(&RunLockRegistry::new())
        .execute(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.hierarchy.len(), 2);
    assert_eq!(outcome.allocation.results.len(), 1);
    assert_eq!(outcome.allocation.results[0].allocated_amount, dec!(10000));
}
