//! Run lock tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::error::LockError;
use super::registry::{LockMode, RunLockRegistry};

const SHORT: Duration = Duration::from_millis(50);
const LONG: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_exclusive_blocks_second_holder() {
    let registry = RunLockRegistry::new();
    let lease = registry
        .acquire("budget:1", LockMode::Exclusive, LONG)
        .await
        .unwrap();
    assert_eq!(lease.resource(), "budget:1");
    assert!(registry.is_held("budget:1"));

    let second = registry.acquire("budget:1", LockMode::Exclusive, SHORT).await;
    assert!(matches!(
        second,
        Err(LockError::Timeout { ref resource, waited }) if resource == "budget:1" && waited == SHORT
    ));
}

#[tokio::test]
async fn test_release_allows_next_holder() {
    let registry = RunLockRegistry::new();
    let lease = registry
        .acquire("budget:1", LockMode::Exclusive, LONG)
        .await
        .unwrap();
    registry.release(lease);
    assert!(!registry.is_held("budget:1"));

    let next = registry.acquire("budget:1", LockMode::Exclusive, SHORT).await;
    assert!(next.is_ok());
}

#[tokio::test]
async fn test_drop_releases() {
    let registry = RunLockRegistry::new();
    {
        let _lease = registry
            .acquire("budget:1", LockMode::Exclusive, LONG)
            .await
            .unwrap();
    }
    assert!(!registry.is_held("budget:1"));
}

#[tokio::test]
async fn test_shared_holders_coexist() {
    let registry = RunLockRegistry::new();
    let a = registry
        .acquire("budget:1", LockMode::Shared, LONG)
        .await
        .unwrap();
    let b = registry
        .acquire("budget:1", LockMode::Shared, SHORT)
        .await
        .unwrap();
    assert_ne!(a.holder_id(), b.holder_id());

    let exclusive = registry.acquire("budget:1", LockMode::Exclusive, SHORT).await;
    assert!(exclusive.is_err());
}

#[tokio::test]
async fn test_disjoint_resources_independent() {
    let registry = RunLockRegistry::new();
    let _a = registry
        .acquire("budget:1", LockMode::Exclusive, LONG)
        .await
        .unwrap();
    let b = registry.acquire("budget:2", LockMode::Exclusive, SHORT).await;
    assert!(b.is_ok());
}

#[tokio::test]
async fn test_waiter_acquires_after_release() {
    let registry = RunLockRegistry::new();
    let lease = registry
        .acquire("budget:1", LockMode::Exclusive, LONG)
        .await
        .unwrap();

    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .acquire("budget:1", LockMode::Exclusive, LONG)
                .await
                .map(|lease| lease.mode())
        })
    };
    tokio::time::sleep(SHORT).await;
    drop(lease);

    assert_eq!(waiter.await.unwrap().unwrap(), LockMode::Exclusive);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exclusive_holders_never_overlap() {
    let registry = RunLockRegistry::new();
    let inside = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::new();

    for _ in 0..8 {
        let registry = registry.clone();
        let inside = Arc::clone(&inside);
        handles.push(tokio::spawn(async move {
            let _lease = registry
                .acquire("budget:shared", LockMode::Exclusive, LONG)
                .await
                .unwrap();
            let concurrent = inside.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(5)).await;
            inside.fetch_sub(1, Ordering::SeqCst);
            concurrent
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }
}
