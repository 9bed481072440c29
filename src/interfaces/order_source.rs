//! Read-only feed of completed orders.

use async_trait::async_trait;

use super::Result;
use crate::model::{Order, OrderFilter, Watermark};

/// Interface to the order repository.
///
/// Implementations:
/// - `PostgresOrderSource` / `SqliteOrderSource`: the `orders` table
/// - `MockOrderSource`: In-memory orders for testing
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch up to `limit` completed orders lying strictly after `since`,
    /// ascending by (completion timestamp, id).
    async fn fetch_batch(
        &self,
        since: &Watermark,
        limit: usize,
        filter: OrderFilter,
    ) -> Result<Vec<Order>>;
}
