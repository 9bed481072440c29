//! Backend-agnostic statements.
//!
//! Each function builds a sea-query statement; the caller renders it with
//! its backend's [`SqlDatabase`](super::SqlDatabase) builder. Dates are
//! bound as `YYYY-MM-DD` text and timestamps in their canonical text form,
//! which both backends coerce into their column types.

use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{
    all, any, Alias, Condition, DeleteStatement, Expr, InsertStatement, OnConflict, Order,
    Query, SelectStatement,
};
use serde_json::Value;

use crate::model::{
    format_timestamp, CheckpointKey, DeadLetter, OrderFilter, SalesFact, SalesProductFact,
    Watermark,
};
use crate::storage::schema::{
    BackgroundStats, BackgroundStatsOrders, BackgroundStatsProducts, Checkpoints, Orders,
    Products, SalesStats, SalesStatsProducts, StatsDeadLetters,
};

/// Text form of a day bucket.
pub fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn select_checkpoint(key: CheckpointKey) -> SelectStatement {
    Query::select()
        .column(Checkpoints::Value)
        .from(Checkpoints::Table)
        .and_where(Expr::col(Checkpoints::Key).eq(key.as_str()))
        .to_owned()
}

pub fn upsert_checkpoint(key: CheckpointKey, value: &Value, now: DateTime<Utc>) -> InsertStatement {
    Query::insert()
        .into_table(Checkpoints::Table)
        .columns([Checkpoints::Key, Checkpoints::Value, Checkpoints::UpdatedAt])
        .values_panic([
            key.as_str().into(),
            value.to_string().into(),
            format_timestamp(&now).into(),
        ])
        .on_conflict(
            OnConflict::column(Checkpoints::Key)
                .update_columns([Checkpoints::Value, Checkpoints::UpdatedAt])
                .to_owned(),
        )
        .to_owned()
}

/// Completed orders strictly after `since`, in watermark order.
pub fn select_orders(since: &Watermark, limit: usize, filter: OrderFilter) -> SelectStatement {
    let at = since.timestamp_text();
    let mut condition = Condition::all()
        .add(Expr::col(Orders::CompletedAt).is_not_null())
        .add(any![
            Expr::col(Orders::CompletedAt).gt(at.as_str()),
            all![
                Expr::col(Orders::CompletedAt).eq(at.as_str()),
                Expr::col(Orders::Id).gt(since.order_id),
            ],
        ]);
    if filter == OrderFilter::Paid {
        condition = condition.add(Expr::col(Orders::Paid).eq(true));
    }

    Query::select()
        .columns([
            Orders::Id,
            Orders::SessionId,
            Orders::CreatedAt,
            Orders::CompletedAt,
            Orders::Paid,
            Orders::Cart,
            Orders::PhotoSelection,
            Orders::Subtotal,
            Orders::Shipping,
            Orders::ShippingTax,
            Orders::Taxes,
            Orders::PromoRebate,
            Orders::PromoApplied,
            Orders::Total,
        ])
        .from(Orders::Table)
        .cond_where(condition)
        .order_by(Orders::CompletedAt, Order::Asc)
        .order_by(Orders::Id, Order::Asc)
        .limit(limit as u64)
        .to_owned()
}

pub fn select_product(product_id: i64) -> SelectStatement {
    Query::select()
        .column(Products::Id)
        .from(Products::Table)
        .and_where(Expr::col(Products::Id).eq(product_id))
        .to_owned()
}

pub fn select_background_order(background_id: i64, date: NaiveDate, order_id: i64) -> SelectStatement {
    Query::select()
        .column(BackgroundStatsOrders::OrderId)
        .from(BackgroundStatsOrders::Table)
        .and_where(Expr::col(BackgroundStatsOrders::BackgroundId).eq(background_id))
        .and_where(Expr::col(BackgroundStatsOrders::Date).eq(date_text(date)))
        .and_where(Expr::col(BackgroundStatsOrders::OrderId).eq(order_id))
        .limit(1)
        .to_owned()
}

/// Add to a background's daily counters, creating the row if needed.
pub fn add_background_usage(
    background_id: i64,
    date: NaiveDate,
    usage: i64,
    conversions: i64,
) -> InsertStatement {
    Query::insert()
        .into_table(BackgroundStats::Table)
        .columns([
            BackgroundStats::BackgroundId,
            BackgroundStats::Date,
            BackgroundStats::UsageCount,
            BackgroundStats::ConversionCount,
        ])
        .values_panic([
            background_id.into(),
            date_text(date).into(),
            usage.into(),
            conversions.into(),
        ])
        .on_conflict(
            OnConflict::columns([BackgroundStats::BackgroundId, BackgroundStats::Date])
                .value(
                    BackgroundStats::UsageCount,
                    Expr::col((BackgroundStats::Table, BackgroundStats::UsageCount))
                        .add(Expr::col((Alias::new("excluded"), BackgroundStats::UsageCount))),
                )
                .value(
                    BackgroundStats::ConversionCount,
                    Expr::col((BackgroundStats::Table, BackgroundStats::ConversionCount)).add(
                        Expr::col((Alias::new("excluded"), BackgroundStats::ConversionCount)),
                    ),
                )
                .to_owned(),
        )
        .to_owned()
}

pub fn insert_background_order(background_id: i64, date: NaiveDate, order_id: i64) -> InsertStatement {
    Query::insert()
        .into_table(BackgroundStatsOrders::Table)
        .columns([
            BackgroundStatsOrders::BackgroundId,
            BackgroundStatsOrders::Date,
            BackgroundStatsOrders::OrderId,
        ])
        .values_panic([background_id.into(), date_text(date).into(), order_id.into()])
        .on_conflict(
            OnConflict::columns([
                BackgroundStatsOrders::BackgroundId,
                BackgroundStatsOrders::Date,
                BackgroundStatsOrders::OrderId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .to_owned()
}

pub fn insert_background_product(
    background_id: i64,
    date: NaiveDate,
    product_id: i64,
) -> InsertStatement {
    Query::insert()
        .into_table(BackgroundStatsProducts::Table)
        .columns([
            BackgroundStatsProducts::BackgroundId,
            BackgroundStatsProducts::Date,
            BackgroundStatsProducts::ProductId,
        ])
        .values_panic([background_id.into(), date_text(date).into(), product_id.into()])
        .on_conflict(
            OnConflict::columns([
                BackgroundStatsProducts::BackgroundId,
                BackgroundStatsProducts::Date,
                BackgroundStatsProducts::ProductId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .to_owned()
}

/// Insert a sales fact, replacing every value of an existing one.
pub fn upsert_sales_fact(fact: &SalesFact) -> InsertStatement {
    Query::insert()
        .into_table(SalesStats::Table)
        .columns([
            SalesStats::Date,
            SalesStats::OrderId,
            SalesStats::SessionId,
            SalesStats::NumberOfSubjects,
            SalesStats::Subtotal,
            SalesStats::Shipping,
            SalesStats::PromoRebate,
            SalesStats::Taxes,
            SalesStats::Returns,
            SalesStats::ReturnFees,
            SalesStats::Total,
        ])
        .values_panic([
            date_text(fact.date).into(),
            fact.order_id.into(),
            fact.session_id.into(),
            fact.number_of_subjects.into(),
            fact.subtotal.into(),
            fact.shipping.into(),
            fact.promo_rebate.into(),
            fact.taxes.into(),
            fact.returns.into(),
            fact.return_fees.into(),
            fact.total.into(),
        ])
        .on_conflict(
            OnConflict::columns([SalesStats::Date, SalesStats::OrderId])
                .update_columns([
                    SalesStats::SessionId,
                    SalesStats::NumberOfSubjects,
                    SalesStats::Subtotal,
                    SalesStats::Shipping,
                    SalesStats::PromoRebate,
                    SalesStats::Taxes,
                    SalesStats::Returns,
                    SalesStats::ReturnFees,
                    SalesStats::Total,
                ])
                .to_owned(),
        )
        .to_owned()
}

pub fn delete_sales_products(date: NaiveDate, order_id: i64) -> DeleteStatement {
    Query::delete()
        .from_table(SalesStatsProducts::Table)
        .and_where(Expr::col(SalesStatsProducts::Date).eq(date_text(date)))
        .and_where(Expr::col(SalesStatsProducts::OrderId).eq(order_id))
        .to_owned()
}

/// `None` when there is nothing to insert.
pub fn insert_sales_products(
    date: NaiveDate,
    order_id: i64,
    products: &[SalesProductFact],
) -> Option<InsertStatement> {
    if products.is_empty() {
        return None;
    }

    let mut stmt = Query::insert();
    stmt.into_table(SalesStatsProducts::Table).columns([
        SalesStatsProducts::Date,
        SalesStatsProducts::OrderId,
        SalesStatsProducts::ProductId,
        SalesStatsProducts::Quantity,
    ]);
    for product in products {
        stmt.values_panic([
            date_text(date).into(),
            order_id.into(),
            product.product_id.to_string().into(),
            product.quantity.into(),
        ]);
    }
    Some(stmt)
}

/// Record a dead letter, keeping the latest reason per (pipeline, order).
pub fn upsert_dead_letter(letter: &DeadLetter, now: DateTime<Utc>) -> InsertStatement {
    Query::insert()
        .into_table(StatsDeadLetters::Table)
        .columns([
            StatsDeadLetters::Pipeline,
            StatsDeadLetters::OrderId,
            StatsDeadLetters::Reason,
            StatsDeadLetters::RecordedAt,
        ])
        .values_panic([
            letter.pipeline.name().into(),
            letter.order_id.into(),
            letter.reason.clone().into(),
            format_timestamp(&now).into(),
        ])
        .on_conflict(
            OnConflict::columns([StatsDeadLetters::Pipeline, StatsDeadLetters::OrderId])
                .update_columns([StatsDeadLetters::Reason, StatsDeadLetters::RecordedAt])
                .to_owned(),
        )
        .to_owned()
}
