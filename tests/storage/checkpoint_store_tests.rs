//! CheckpointStore interface tests.
//!
//! These tests verify checkpoint reads and writes through batch
//! transactions. Each storage implementation should run these tests on a
//! database without checkpoints.

use serde_json::json;
use studio_stats::interfaces::{CheckpointStore, StatsStore, StatsTransaction};
use studio_stats::model::CheckpointKey;

// =============================================================================
// Reads
// =============================================================================

pub async fn test_missing_checkpoints_read_none<S: StatsStore>(store: &S) {
    for key in CheckpointKey::ALL {
        let value = store
            .read_checkpoint(key)
            .await
            .expect("read should succeed");
        assert!(value.is_none(), "{} should not exist yet", key);
    }

    let mut tx = store.begin().await.expect("begin should succeed");
    let value = tx
        .get(CheckpointKey::LastSalesStatsProcessedOrderId)
        .await
        .expect("get should succeed");
    assert!(value.is_none());
    tx.rollback().await.unwrap();
}

// =============================================================================
// Writes
// =============================================================================

pub async fn test_set_visible_in_transaction_and_after_commit<S: StatsStore>(store: &S) {
    let key = CheckpointKey::LastBackgroundStatsOrderUpdateTimestamp;
    let value = json!("2024-06-01T09:00:01.000000Z");

    let mut tx = store.begin().await.unwrap();
    tx.set(key, &value).await.expect("set should succeed");
    assert_eq!(tx.get(key).await.unwrap(), Some(value.clone()));
    tx.commit().await.expect("commit should succeed");

    assert_eq!(store.read_checkpoint(key).await.unwrap(), Some(value));
}

pub async fn test_set_overwrites<S: StatsStore>(store: &S) {
    let key = CheckpointKey::LastBackgroundStatsProcessedOrderId;

    for id in [10, 25] {
        let mut tx = store.begin().await.unwrap();
        tx.set(key, &json!(id)).await.unwrap();
        tx.commit().await.unwrap();
    }

    assert_eq!(
        store.read_checkpoint(key).await.unwrap(),
        Some(json!(25)),
        "should return the latest value"
    );
}

pub async fn test_rollback_discards_writes<S: StatsStore>(store: &S) {
    let key = CheckpointKey::LastBackgroundStatsProcessedOrderId;
    let before = store.read_checkpoint(key).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.set(key, &json!(999)).await.unwrap();
    tx.rollback().await.expect("rollback should succeed");

    assert_eq!(store.read_checkpoint(key).await.unwrap(), before);
}

pub async fn test_dropped_transaction_discards_writes<S: StatsStore>(store: &S) {
    let key = CheckpointKey::LastSalesStatsOrderUpdateTimestamp;

    {
        let mut tx = store.begin().await.unwrap();
        tx.set(key, &json!("2030-01-01T00:00:00.000000Z"))
            .await
            .unwrap();
    }

    assert!(store.read_checkpoint(key).await.unwrap().is_none());
}

// =============================================================================
// Value types
// =============================================================================

pub async fn test_json_types_preserved<S: StatsStore>(store: &S) {
    let text_key = CheckpointKey::LastSalesStatsOrderUpdateTimestamp;
    let number_key = CheckpointKey::LastSalesStatsProcessedOrderId;

    let mut tx = store.begin().await.unwrap();
    tx.set(text_key, &json!("2024-06-01T09:00:00.123456Z"))
        .await
        .unwrap();
    tx.set(number_key, &json!(9_007_199_254_740_993_i64))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let text = store.read_checkpoint(text_key).await.unwrap().unwrap();
    assert_eq!(text.as_str(), Some("2024-06-01T09:00:00.123456Z"));

    let number = store.read_checkpoint(number_key).await.unwrap().unwrap();
    assert_eq!(number.as_i64(), Some(9_007_199_254_740_993));
}

/// Run all CheckpointStore tests against a store implementation.
#[macro_export]
macro_rules! run_checkpoint_store_tests {
    ($store:expr) => {
        use $crate::storage::checkpoint_store_tests::*;

        // reads
        test_missing_checkpoints_read_none($store).await;
        println!("  test_missing_checkpoints_read_none: PASSED");

        // writes
        test_set_visible_in_transaction_and_after_commit($store).await;
        println!("  test_set_visible_in_transaction_and_after_commit: PASSED");

        test_set_overwrites($store).await;
        println!("  test_set_overwrites: PASSED");

        test_rollback_discards_writes($store).await;
        println!("  test_rollback_discards_writes: PASSED");

        test_dropped_transaction_discards_writes($store).await;
        println!("  test_dropped_transaction_discards_writes: PASSED");

        // value types
        test_json_types_preserved($store).await;
        println!("  test_json_types_preserved: PASSED");
    };
}
