//! AdvisoryLock interface tests.
//!
//! Single-transaction contract: locks are free when nobody holds them,
//! re-entrant inside their transaction, and released by commit or rollback.
//! Exclusion between concurrent transactions needs a second connection and
//! is tested per backend.

use studio_stats::interfaces::{AdvisoryLock, StatsStore, StatsTransaction};
use studio_stats::model::LockKey;

pub async fn test_try_acquire_free_lock<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.try_acquire(LockKey::BackgroundStats)
        .await
        .expect("free lock should be acquired");
    tx.rollback().await.unwrap();
}

pub async fn test_lock_is_reentrant<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.try_acquire(LockKey::SalesStats).await.unwrap();
    tx.try_acquire(LockKey::SalesStats)
        .await
        .expect("holder should acquire its own lock again");
    tx.acquire(LockKey::SalesStats)
        .await
        .expect("blocking acquire should not wait on its own lock");
    tx.rollback().await.unwrap();
}

pub async fn test_locks_are_independent<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.try_acquire(LockKey::BackgroundStats).await.unwrap();
    tx.try_acquire(LockKey::SalesStats)
        .await
        .expect("each pipeline has its own lock");
    tx.rollback().await.unwrap();
}

pub async fn test_commit_releases_lock<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.try_acquire(LockKey::BackgroundStats).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.try_acquire(LockKey::BackgroundStats)
        .await
        .expect("lock should be free after commit");
    tx.rollback().await.unwrap();
}

pub async fn test_rollback_releases_lock<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.lock(LockKey::SalesStats, true).await.unwrap();
    tx.rollback().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.lock(LockKey::SalesStats, false)
        .await
        .expect("lock should be free after rollback");
    tx.rollback().await.unwrap();
}

/// Run all AdvisoryLock tests against a store implementation.
#[macro_export]
macro_rules! run_advisory_lock_tests {
    ($store:expr) => {
        use $crate::storage::advisory_lock_tests::*;

        test_try_acquire_free_lock($store).await;
        println!("  test_try_acquire_free_lock: PASSED");

        test_lock_is_reentrant($store).await;
        println!("  test_lock_is_reentrant: PASSED");

        test_locks_are_independent($store).await;
        println!("  test_locks_are_independent: PASSED");

        test_commit_releases_lock($store).await;
        println!("  test_commit_releases_lock: PASSED");

        test_rollback_releases_lock($store).await;
        println!("  test_rollback_releases_lock: PASSED");
    };
}
