//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! The tables themselves are created by the migrations under `migrations/`.

use sea_query::Iden;

/// Checkpoints table schema.
#[derive(Iden)]
pub enum Checkpoints {
    Table,
    #[iden = "key"]
    Key,
    #[iden = "value"]
    Value,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Products reference table (read-only).
#[derive(Iden)]
pub enum Products {
    Table,
    #[iden = "id"]
    Id,
}

/// Orders table schema (read-only).
#[derive(Iden)]
pub enum Orders {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "session_id"]
    SessionId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "completed_at"]
    CompletedAt,
    #[iden = "paid"]
    Paid,
    #[iden = "cart"]
    Cart,
    #[iden = "photo_selection"]
    PhotoSelection,
    #[iden = "subtotal"]
    Subtotal,
    #[iden = "shipping"]
    Shipping,
    #[iden = "shipping_tax"]
    ShippingTax,
    #[iden = "taxes"]
    Taxes,
    #[iden = "promo_rebate"]
    PromoRebate,
    #[iden = "promo_applied"]
    PromoApplied,
    #[iden = "total"]
    Total,
}

/// Daily background usage counters.
#[derive(Iden)]
pub enum BackgroundStats {
    Table,
    #[iden = "background_id"]
    BackgroundId,
    #[iden = "date"]
    Date,
    #[iden = "usage_count"]
    UsageCount,
    #[iden = "conversion_count"]
    ConversionCount,
}

/// Orders counted in a background's daily stats.
#[derive(Iden)]
pub enum BackgroundStatsOrders {
    Table,
    #[iden = "background_id"]
    BackgroundId,
    #[iden = "date"]
    Date,
    #[iden = "order_id"]
    OrderId,
}

/// Catalog products printed on a background on a day.
#[derive(Iden)]
pub enum BackgroundStatsProducts {
    Table,
    #[iden = "background_id"]
    BackgroundId,
    #[iden = "date"]
    Date,
    #[iden = "product_id"]
    ProductId,
}

/// One row per paid order.
#[derive(Iden)]
pub enum SalesStats {
    Table,
    #[iden = "date"]
    Date,
    #[iden = "order_id"]
    OrderId,
    #[iden = "session_id"]
    SessionId,
    #[iden = "number_of_subjects"]
    NumberOfSubjects,
    #[iden = "subtotal"]
    Subtotal,
    #[iden = "shipping"]
    Shipping,
    #[iden = "promo_rebate"]
    PromoRebate,
    #[iden = "taxes"]
    Taxes,
    #[iden = "returns"]
    Returns,
    #[iden = "return_fees"]
    ReturnFees,
    #[iden = "total"]
    Total,
}

/// Units sold per product and order. Product ids are text so virtual
/// products fit.
#[derive(Iden)]
pub enum SalesStatsProducts {
    Table,
    #[iden = "date"]
    Date,
    #[iden = "order_id"]
    OrderId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "quantity"]
    Quantity,
}

/// Orders a pipeline could not process.
#[derive(Iden)]
pub enum StatsDeadLetters {
    Table,
    #[iden = "pipeline"]
    Pipeline,
    #[iden = "order_id"]
    OrderId,
    #[iden = "reason"]
    Reason,
    #[iden = "recorded_at"]
    RecordedAt,
}
