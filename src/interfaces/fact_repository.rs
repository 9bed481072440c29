//! Rollup table writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::Result;
use crate::model::{DeadLetter, SalesFact, SalesProductFact};

/// Persistence operations of the aggregators, executed on the batch
/// transaction.
///
/// Writers assume they are the only writer of these tables while they hold
/// the pipeline lock.
#[async_trait]
pub trait FactRepository: Send {
    /// Truncate a timestamp to its UTC calendar day, computed by the database.
    async fn day_bucket(&mut self, at: DateTime<Utc>) -> Result<NaiveDate>;

    /// Whether `order_id` already counted towards this background and day.
    async fn background_order_recorded(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        order_id: i64,
    ) -> Result<bool>;

    /// Additive upsert of the usage/conversion counters.
    async fn add_background_usage(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        usage: i64,
        conversions: i64,
    ) -> Result<()>;

    /// Insert-or-ignore the (background, day, order) association.
    async fn record_background_order(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        order_id: i64,
    ) -> Result<()>;

    /// Insert-or-ignore the (background, day, catalog product) association.
    async fn record_background_product(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        product_id: i64,
    ) -> Result<()>;

    /// Insert the sales fact, replacing any row with the same (date, order).
    async fn upsert_sales_fact(&mut self, fact: &SalesFact) -> Result<()>;

    /// Delete every product row of (date, order), then insert `products`.
    async fn replace_sales_products(
        &mut self,
        date: NaiveDate,
        order_id: i64,
        products: &[SalesProductFact],
    ) -> Result<()>;

    /// Flag an order the pipeline skipped. Re-recording updates the reason.
    async fn record_dead_letter(&mut self, letter: &DeadLetter) -> Result<()>;
}
