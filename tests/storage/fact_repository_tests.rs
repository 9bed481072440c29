//! FactRepository interface tests.
//!
//! Requires the fixture orders and products of [`super::fixture_orders`]
//! to be present, since fact rows reference them.

use chrono::{NaiveDate, TimeZone, Utc};
use studio_stats::interfaces::{FactRepository, StatsStore, StatsTransaction};
use studio_stats::model::{DeadLetter, PipelineKind, ProductId, SalesFact, SalesProductFact};

/// Background used by these tests only, so pipeline counters stay clean.
const BACKGROUND: i64 = 501;

fn day() -> NaiveDate {
    super::fixture_day()
}

fn fact(order_id: i64, total: i64) -> SalesFact {
    SalesFact {
        date: day(),
        order_id,
        session_id: Some(100),
        number_of_subjects: 2,
        subtotal: total,
        shipping: 0,
        promo_rebate: 0,
        taxes: 0,
        returns: 0,
        return_fees: 0,
        total,
    }
}

// =============================================================================
// Day buckets
// =============================================================================

pub async fn test_day_bucket_is_utc_date<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();

    let late = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap();
    assert_eq!(
        tx.day_bucket(late).await.expect("day_bucket should succeed"),
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    );

    let midnight = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
    assert_eq!(
        tx.day_bucket(midnight).await.unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
    );

    tx.rollback().await.unwrap();
}

// =============================================================================
// Background facts
// =============================================================================

pub async fn test_background_order_visible_in_transaction<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    assert!(!tx.background_order_recorded(BACKGROUND, day(), 1).await.unwrap());

    tx.add_background_usage(BACKGROUND, day(), 1, 1).await.unwrap();
    tx.record_background_order(BACKGROUND, day(), 1).await.unwrap();
    assert!(tx.background_order_recorded(BACKGROUND, day(), 1).await.unwrap());
    tx.rollback().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(
        !tx.background_order_recorded(BACKGROUND, day(), 1).await.unwrap(),
        "rolled back association should be gone"
    );
    tx.rollback().await.unwrap();
}

pub async fn test_background_facts_commit<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    // Association first: constraints are checked at commit.
    tx.record_background_order(BACKGROUND, day(), 2).await.unwrap();
    tx.add_background_usage(BACKGROUND, day(), 1, 0).await.unwrap();
    tx.record_background_product(BACKGROUND, day(), 10).await.unwrap();
    tx.record_background_product(BACKGROUND, day(), 10)
        .await
        .expect("recording a product twice is a no-op");
    tx.record_background_order(BACKGROUND, day(), 2)
        .await
        .expect("recording an order twice is a no-op");
    tx.commit().await.expect("commit should succeed");

    let mut tx = store.begin().await.unwrap();
    assert!(tx.background_order_recorded(BACKGROUND, day(), 2).await.unwrap());
    assert!(!tx.background_order_recorded(BACKGROUND, day(), 3).await.unwrap());
    assert!(!tx
        .background_order_recorded(BACKGROUND + 1, day(), 2)
        .await
        .unwrap());
    tx.rollback().await.unwrap();
}

pub async fn test_unknown_product_is_skipped<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.add_background_usage(BACKGROUND, day(), 1, 1).await.unwrap();
    tx.record_background_order(BACKGROUND, day(), 3).await.unwrap();
    tx.record_background_product(BACKGROUND, day(), 424_242)
        .await
        .expect("unknown product should be skipped");
    tx.commit()
        .await
        .expect("commit should not trip over the unknown product");
}

// =============================================================================
// Sales facts
// =============================================================================

pub async fn test_sales_fact_replaced<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.upsert_sales_fact(&fact(1, 4000)).await.unwrap();
    tx.replace_sales_products(
        day(),
        1,
        &[
            SalesProductFact {
                product_id: ProductId::Catalog(10),
                quantity: 2,
            },
            SalesProductFact {
                product_id: ProductId::Virtual("retouch".into()),
                quantity: 1,
            },
        ],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.upsert_sales_fact(&fact(1, 4500))
        .await
        .expect("upsert of an existing fact should succeed");
    tx.replace_sales_products(
        day(),
        1,
        &[SalesProductFact {
            product_id: ProductId::Catalog(11),
            quantity: 3,
        }],
    )
    .await
    .expect("replacing products should succeed");
    tx.commit().await.unwrap();
}

pub async fn test_sales_products_may_be_empty<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.upsert_sales_fact(&fact(5, 1000)).await.unwrap();
    tx.replace_sales_products(day(), 5, &[])
        .await
        .expect("an order without products is valid");
    tx.commit().await.unwrap();
}

// =============================================================================
// Dead letters
// =============================================================================

pub async fn test_dead_letter_upserted<S: StatsStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.record_dead_letter(&DeadLetter::new(PipelineKind::SalesStats, 4, "first"))
        .await
        .unwrap();
    tx.record_dead_letter(&DeadLetter::new(PipelineKind::SalesStats, 4, "second"))
        .await
        .expect("recording the same order again should update it");
    tx.record_dead_letter(&DeadLetter::new(PipelineKind::BackgroundStats, 4, "first"))
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

/// Run all FactRepository tests against a store implementation.
#[macro_export]
macro_rules! run_fact_repository_tests {
    ($store:expr) => {
        use $crate::storage::fact_repository_tests::*;

        // day buckets
        test_day_bucket_is_utc_date($store).await;
        println!("  test_day_bucket_is_utc_date: PASSED");

        // background facts
        test_background_order_visible_in_transaction($store).await;
        println!("  test_background_order_visible_in_transaction: PASSED");

        test_background_facts_commit($store).await;
        println!("  test_background_facts_commit: PASSED");

        test_unknown_product_is_skipped($store).await;
        println!("  test_unknown_product_is_skipped: PASSED");

        // sales facts
        test_sales_fact_replaced($store).await;
        println!("  test_sales_fact_replaced: PASSED");

        test_sales_products_may_be_empty($store).await;
        println!("  test_sales_products_may_be_empty: PASSED");

        // dead letters
        test_dead_letter_upserted($store).await;
        println!("  test_dead_letter_upserted: PASSED");
    };
}
