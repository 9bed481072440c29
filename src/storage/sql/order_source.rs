//! Unified SQL OrderSource implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::SqlDatabase;
use crate::model::{CartItem, Order, PhotoSelection, SaleTotals};

/// SQL-based implementation of OrderSource.
///
/// Reads the `orders` table of the same database the statistics live in.
pub struct SqlOrderSource<DB: SqlDatabase> {
    pool: DB::Pool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlOrderSource<DB> {
    /// Create a new SQL order source with the given pool.
    pub fn new(pool: DB::Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }
}

/// Columns of one `orders` row, JSON documents still undecoded.
pub struct OrderRow {
    pub id: i64,
    pub session_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub paid: bool,
    /// Raw cart document, or why it could not be read.
    pub cart: std::result::Result<Value, String>,
    pub photo_selection: std::result::Result<Value, String>,
    pub totals: SaleTotals,
}

impl OrderRow {
    /// Decode the JSON documents. A document that does not decode leaves
    /// the order empty and records the defect, so the order is dead-lettered
    /// instead of failing the whole batch.
    pub fn into_order(self) -> Order {
        let mut defects = Vec::new();
        let cart: Vec<CartItem> = decode_document("cart", self.cart, &mut defects);
        let photo_selection: BTreeMap<String, PhotoSelection> =
            decode_document("photo selection", self.photo_selection, &mut defects);

        Order {
            id: self.id,
            session_id: self.session_id,
            created_at: self.created_at,
            completed_at: self.completed_at,
            paid: self.paid,
            cart,
            photo_selection,
            totals: self.totals,
            defect: if defects.is_empty() {
                None
            } else {
                Some(defects.join("; "))
            },
        }
    }
}

fn decode_document<T: DeserializeOwned + Default>(
    what: &str,
    raw: std::result::Result<Value, String>,
    defects: &mut Vec<String>,
) -> T {
    let decoded = match raw {
        Ok(Value::Null) => return T::default(),
        Ok(value) => serde_json::from_value(value).map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };
    decoded.unwrap_or_else(|e| {
        defects.push(format!("unreadable {}: {}", what, e));
        T::default()
    })
}

/// Macro to implement OrderSource for a specific SQL backend.
///
/// `$json_column` reads a JSON document column of the backend's row type
/// as `Result<Result<Value, String>>`: the outer error is a database error,
/// the inner one a document that is not JSON.
macro_rules! impl_order_source {
    ($db_type:ty, $feature:literal, $json_column:path) => {
        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::OrderSource for SqlOrderSource<$db_type> {
            async fn fetch_batch(
                &self,
                since: &crate::model::Watermark,
                limit: usize,
                filter: crate::model::OrderFilter,
            ) -> crate::interfaces::Result<Vec<Order>> {
                use sqlx::Row;

                use crate::storage::sql::statements;

                let sql = <$db_type>::build_select(statements::select_orders(since, limit, filter));
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

                let mut orders = Vec::with_capacity(rows.len());
                for row in rows {
                    let totals = SaleTotals {
                        subtotal: row.try_get::<Option<i64>, _>("subtotal")?.unwrap_or(0),
                        shipping: row.try_get::<Option<i64>, _>("shipping")?.unwrap_or(0),
                        shipping_tax: row.try_get::<Option<i64>, _>("shipping_tax")?.unwrap_or(0),
                        taxes: row.try_get::<Option<i64>, _>("taxes")?.unwrap_or(0),
                        promo_rebate: row.try_get::<Option<i64>, _>("promo_rebate")?.unwrap_or(0),
                        promo_applied: row
                            .try_get::<Option<bool>, _>("promo_applied")?
                            .unwrap_or(false),
                        total: row.try_get::<Option<i64>, _>("total")?.unwrap_or(0),
                    };
                    let order = OrderRow {
                        id: row.try_get("id")?,
                        session_id: row.try_get("session_id")?,
                        created_at: row.try_get("created_at")?,
                        completed_at: row.try_get("completed_at")?,
                        paid: row.try_get("paid")?,
                        cart: $json_column(&row, "cart")?,
                        photo_selection: $json_column(&row, "photo_selection")?,
                        totals,
                    };
                    orders.push(order.into_order());
                }
                Ok(orders)
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_order_source!(
    super::postgres::Postgres,
    "postgres",
    crate::storage::postgres::json_column
);
impl_order_source!(
    super::sqlite::Sqlite,
    "sqlite",
    crate::storage::sqlite::json_column
);
