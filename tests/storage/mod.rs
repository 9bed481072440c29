//! Shared storage integration tests.
//!
//! Tests the CheckpointStore, AdvisoryLock, FactRepository and OrderSource
//! interfaces, plus whole pipeline runs, against every SQL backend. Each
//! backend test binary seeds the fixture below and runs these tests.

pub mod advisory_lock_tests;
pub mod checkpoint_store_tests;
pub mod fact_repository_tests;
pub mod pipeline_tests;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use studio_stats::model::{Order, SaleTotals};
use studio_stats::test_utils::{base_time, OrderBuilder};

/// Catalog products the fixture orders may reference. Product 99 is
/// deliberately missing.
pub const FIXTURE_PRODUCTS: [i64; 2] = [10, 11];

/// Order that is not completed yet. Backends insert it with a NULL
/// completion time.
pub const PENDING_ORDER_ID: i64 = 6;

/// Order whose cart is a JSON object instead of a list.
pub const BROKEN_ORDER_ID: i64 = 9;

pub fn fixture_day() -> NaiveDate {
    base_time().date_naive()
}

/// Completion time shared by orders 7 and 8.
pub fn shared_time() -> DateTime<Utc> {
    base_time() + Duration::seconds(100)
}

/// Completion time of the broken order, the latest of the fixture.
pub fn broken_time() -> DateTime<Utc> {
    base_time() + Duration::seconds(200)
}

/// Completed orders of the fixture, except the broken one.
///
/// | id | paid | content |
/// |----|------|---------|
/// | 1  | yes  | backgrounds 7, 8 on product 10; virtual "retouch"; promo |
/// | 2  | no   | background 7 on product 11 |
/// | 3  | yes  | background 7 on product 99 (not in the catalog) |
/// | 4  | yes  | references a photo it did not select |
/// | 5  | yes  | empty cart, rebate without promo |
/// | 7  | no   | background 7 on product 10, same timestamp as 8 |
/// | 8  | yes  | background 9 on product 11 |
pub fn fixture_orders() -> Vec<Order> {
    vec![
        OrderBuilder::new(1)
            .paid()
            .photo("p1", "S1", Some(7))
            .photo("p2", "S2", Some(8))
            .item(10, 1, &["p1", "p2"])
            .virtual_item("retouch", 1, &[])
            .totals(SaleTotals {
                subtotal: 5000,
                shipping: 500,
                shipping_tax: 50,
                taxes: 400,
                promo_rebate: 300,
                promo_applied: true,
                total: 5650,
            })
            .build(),
        OrderBuilder::new(2)
            .photo("p1", "S1", Some(7))
            .item(11, 2, &["p1"])
            .build(),
        OrderBuilder::new(3)
            .paid()
            .photo("p1", "S1", Some(7))
            .item(99, 1, &["p1"])
            .build(),
        OrderBuilder::new(4)
            .paid()
            .item(10, 1, &["ghost"])
            .build(),
        OrderBuilder::new(5)
            .paid()
            .session(None)
            .totals(SaleTotals {
                subtotal: 1000,
                promo_rebate: 200,
                total: 1000,
                ..SaleTotals::default()
            })
            .build(),
        OrderBuilder::new(7)
            .completed_at(shared_time())
            .photo("p1", "S1", Some(7))
            .item(10, 1, &["p1"])
            .build(),
        OrderBuilder::new(8)
            .paid()
            .completed_at(shared_time())
            .photo("p1", "S3", Some(9))
            .item(11, 1, &["p1"])
            .build(),
    ]
}

/// Cart document of the broken order.
pub const BROKEN_CART: &str = r#"{"not": "a list"}"#;

/// JSON documents of an order, as stored in the orders table.
pub fn documents(order: &Order) -> (String, String) {
    (
        serde_json::to_string(&order.cart).unwrap(),
        serde_json::to_string(&order.photo_selection).unwrap(),
    )
}

/// Implements [`pipeline_tests::FactReader`] for a wrapper around a sqlx
/// pool. The queries are plain SQL valid on every backend.
#[macro_export]
macro_rules! impl_fact_reader {
    ($reader:ident, $pool:ty) => {
        pub struct $reader(pub $pool);

        #[async_trait::async_trait]
        impl $crate::storage::pipeline_tests::FactReader for $reader {
            async fn background_stat(&self, background_id: i64) -> Option<(i64, i64)> {
                use sqlx::Row;

                sqlx::query(&format!(
                    "SELECT usage_count, conversion_count FROM background_stats WHERE background_id = {}",
                    background_id
                ))
                .fetch_optional(&self.0)
                .await
                .unwrap()
                .map(|row| (row.get(0), row.get(1)))
            }

            async fn count(&self, table: &str) -> i64 {
                use sqlx::Row;

                sqlx::query(&format!("SELECT COUNT(*) FROM {}", table))
                    .fetch_one(&self.0)
                    .await
                    .unwrap()
                    .get(0)
            }

            async fn background_products(&self) -> Vec<(i64, i64)> {
                use sqlx::Row;

                sqlx::query(
                    "SELECT background_id, product_id FROM background_stats_products \
                     ORDER BY background_id, product_id",
                )
                .fetch_all(&self.0)
                .await
                .unwrap()
                .iter()
                .map(|row| (row.get(0), row.get(1)))
                .collect()
            }

            async fn sales_rows(&self) -> Vec<$crate::storage::pipeline_tests::SalesRow> {
                use sqlx::Row;

                sqlx::query(
                    "SELECT order_id, session_id, number_of_subjects, subtotal, shipping, \
                     promo_rebate, taxes, total FROM sales_stats ORDER BY order_id",
                )
                .fetch_all(&self.0)
                .await
                .unwrap()
                .iter()
                .map(|row| $crate::storage::pipeline_tests::SalesRow {
                    order_id: row.get(0),
                    session_id: row.get(1),
                    number_of_subjects: row.get(2),
                    subtotal: row.get(3),
                    shipping: row.get(4),
                    promo_rebate: row.get(5),
                    taxes: row.get(6),
                    total: row.get(7),
                })
                .collect()
            }

            async fn sales_products(&self) -> Vec<(i64, String, i64)> {
                use sqlx::Row;

                sqlx::query(
                    "SELECT order_id, product_id, quantity FROM sales_stats_products \
                     ORDER BY order_id, product_id",
                )
                .fetch_all(&self.0)
                .await
                .unwrap()
                .iter()
                .map(|row| (row.get(0), row.get(1), row.get(2)))
                .collect()
            }

            async fn dead_letters(&self) -> Vec<(String, i64)> {
                use sqlx::Row;

                sqlx::query("SELECT pipeline, order_id FROM stats_dead_letters ORDER BY pipeline, order_id")
                    .fetch_all(&self.0)
                    .await
                    .unwrap()
                    .iter()
                    .map(|row| (row.get(0), row.get(1)))
                    .collect()
            }

            async fn clear_checkpoints(&self) {
                sqlx::query("DELETE FROM checkpoints")
                    .execute(&self.0)
                    .await
                    .unwrap();
            }
        }
    };
}
