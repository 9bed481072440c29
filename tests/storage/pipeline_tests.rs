//! Whole pipeline runs against a real database.
//!
//! Requires the full fixture and a database without statistics. Results
//! are read back with plain SQL through [`FactReader`].

use async_trait::async_trait;
use studio_stats::interfaces::StatsStore;
use studio_stats::model::{format_timestamp, PipelineKind};
use studio_stats::pipeline::{RunOutcome, StatsCompiler};

use super::{broken_time, BROKEN_ORDER_ID};

/// One row of `sales_stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRow {
    pub order_id: i64,
    pub session_id: Option<i64>,
    pub number_of_subjects: i64,
    pub subtotal: i64,
    pub shipping: i64,
    pub promo_rebate: i64,
    pub taxes: i64,
    pub total: i64,
}

/// Direct read access to the fact tables.
#[async_trait]
pub trait FactReader: Send + Sync {
    /// (usage, conversions) of a background on any day.
    async fn background_stat(&self, background_id: i64) -> Option<(i64, i64)>;
    async fn count(&self, table: &str) -> i64;
    /// (background, product) pairs.
    async fn background_products(&self) -> Vec<(i64, i64)>;
    async fn sales_rows(&self) -> Vec<SalesRow>;
    /// (order, product, quantity) rows.
    async fn sales_products(&self) -> Vec<(i64, String, i64)>;
    /// (pipeline, order) pairs.
    async fn dead_letters(&self) -> Vec<(String, i64)>;
    async fn clear_checkpoints(&self);
}

async fn assert_background_facts<R: FactReader>(reader: &R) {
    assert_eq!(reader.background_stat(7).await, Some((4, 2)));
    assert_eq!(reader.background_stat(8).await, Some((1, 1)));
    assert_eq!(reader.background_stat(9).await, Some((1, 1)));
    assert_eq!(reader.count("background_stats_orders").await, 6);
    // Product 99 is not in the catalog.
    assert_eq!(
        reader.background_products().await,
        vec![(7, 10), (7, 11), (8, 10), (9, 11)]
    );
}

async fn assert_sales_facts<R: FactReader>(reader: &R) {
    assert_eq!(
        reader.sales_rows().await,
        vec![
            SalesRow {
                order_id: 1,
                session_id: Some(100),
                number_of_subjects: 2,
                subtotal: 5000,
                shipping: 500,
                promo_rebate: 300,
                taxes: 450,
                total: 5650,
            },
            SalesRow {
                order_id: 3,
                session_id: Some(100),
                number_of_subjects: 1,
                subtotal: 0,
                shipping: 0,
                promo_rebate: 0,
                taxes: 0,
                total: 0,
            },
            SalesRow {
                order_id: 5,
                session_id: None,
                number_of_subjects: 0,
                subtotal: 1000,
                shipping: 0,
                promo_rebate: 0,
                taxes: 0,
                total: 1000,
            },
            SalesRow {
                order_id: 8,
                session_id: Some(100),
                number_of_subjects: 1,
                subtotal: 0,
                shipping: 0,
                promo_rebate: 0,
                taxes: 0,
                total: 0,
            },
        ]
    );
    assert_eq!(
        reader.sales_products().await,
        vec![
            (1, "10".to_string(), 2),
            (1, "retouch".to_string(), 1),
            (3, "99".to_string(), 1),
            (8, "11".to_string(), 1),
        ]
    );
}

pub async fn test_pipelines_compile_fixture<S: StatsStore, R: FactReader>(
    compiler: &StatsCompiler,
    store: &S,
    reader: &R,
) {
    let background = compiler.compile_background_stats().await;
    assert_eq!(background.outcome, RunOutcome::Drained);
    assert_eq!(background.orders, 8);
    assert_eq!(background.dead_lettered, 2);
    assert_background_facts(reader).await;

    let sales = compiler.compile_sales_stats().await;
    assert_eq!(sales.outcome, RunOutcome::Drained);
    assert_eq!(sales.orders, 6);
    assert_eq!(sales.dead_lettered, 2);
    assert_sales_facts(reader).await;

    assert_eq!(
        reader.dead_letters().await,
        vec![
            ("backgroundStats".to_string(), 4),
            ("backgroundStats".to_string(), BROKEN_ORDER_ID),
            ("salesStats".to_string(), 4),
            ("salesStats".to_string(), BROKEN_ORDER_ID),
        ]
    );

    for kind in [PipelineKind::BackgroundStats, PipelineKind::SalesStats] {
        let at = store.read_checkpoint(kind.timestamp_key()).await.unwrap();
        let id = store.read_checkpoint(kind.order_id_key()).await.unwrap();
        assert_eq!(
            at.as_ref().and_then(|v| v.as_str()),
            Some(format_timestamp(&broken_time()).as_str())
        );
        assert_eq!(id.and_then(|v| v.as_i64()), Some(BROKEN_ORDER_ID));
    }
}

pub async fn test_rerun_changes_nothing<R: FactReader>(compiler: &StatsCompiler, reader: &R) {
    let background = compiler.compile_background_stats().await;
    let sales = compiler.compile_sales_stats().await;

    assert_eq!(background.batches, 0);
    assert_eq!(sales.batches, 0);
    assert_background_facts(reader).await;
    assert_sales_facts(reader).await;
}

pub async fn test_reprocessing_converges<R: FactReader>(compiler: &StatsCompiler, reader: &R) {
    reader.clear_checkpoints().await;

    let background = compiler.compile_background_stats().await;
    let sales = compiler.compile_sales_stats().await;

    assert_eq!(background.orders, 8);
    assert_eq!(sales.orders, 6);
    assert_background_facts(reader).await;
    assert_sales_facts(reader).await;
    assert_eq!(reader.count("stats_dead_letters").await, 4);
}

pub async fn test_small_batches_reach_same_result<R: FactReader>(
    compiler: &StatsCompiler,
    reader: &R,
) {
    reader.clear_checkpoints().await;

    let background = compiler.compile_background_stats().await;

    assert_eq!(background.outcome, RunOutcome::Drained);
    assert!(background.batches > 1, "fixture should span several batches");
    assert_eq!(background.orders, 8);
    assert_background_facts(reader).await;
}

/// Run the pipeline tests.
///
/// `$compiler` uses the default batch size, `$small_batches` a batch size
/// below the fixture size. Both share `$store`.
#[macro_export]
macro_rules! run_pipeline_tests {
    ($compiler:expr, $small_batches:expr, $store:expr, $reader:expr) => {
        use $crate::storage::pipeline_tests::*;

        test_pipelines_compile_fixture($compiler, $store, $reader).await;
        println!("  test_pipelines_compile_fixture: PASSED");

        test_rerun_changes_nothing($compiler, $reader).await;
        println!("  test_rerun_changes_nothing: PASSED");

        test_reprocessing_converges($compiler, $reader).await;
        println!("  test_reprocessing_converges: PASSED");

        test_small_batches_reach_same_result($small_batches, $reader).await;
        println!("  test_small_batches_reach_same_result: PASSED");
    };
}
