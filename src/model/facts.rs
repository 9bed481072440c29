//! Rows written into the rollup tables.

use chrono::NaiveDate;

use super::{PipelineKind, ProductId};

/// Counters of `background_stats` for one (background, day).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackgroundStat {
    pub usage_count: i64,
    pub conversion_count: i64,
}

/// One `sales_stats` row. Amounts in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesFact {
    pub date: NaiveDate,
    pub order_id: i64,
    pub session_id: Option<i64>,
    pub number_of_subjects: i64,
    pub subtotal: i64,
    pub shipping: i64,
    pub promo_rebate: i64,
    pub taxes: i64,
    pub returns: i64,
    pub return_fees: i64,
    pub total: i64,
}

/// One `sales_stats_products` row, scoped to the parent sales fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesProductFact {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An order a pipeline could not aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub pipeline: PipelineKind,
    pub order_id: i64,
    pub reason: String,
}

impl DeadLetter {
    pub fn new(pipeline: PipelineKind, order_id: i64, reason: impl Into<String>) -> Self {
        Self {
            pipeline,
            order_id,
            reason: reason.into(),
        }
    }
}
