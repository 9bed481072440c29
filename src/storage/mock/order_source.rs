//! Mock OrderSource implementation for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::{OrderSource, Result, StatsError};
use crate::model::{Order, OrderFilter, Watermark};

/// Mock order source serving orders from memory.
#[derive(Default)]
pub struct MockOrderSource {
    orders: RwLock<Vec<Order>>,
    fail_on_fetch: RwLock<bool>,
    delay: RwLock<Option<Duration>>,
    fetches: AtomicUsize,
}

impl MockOrderSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: RwLock::new(orders),
            ..Self::default()
        }
    }

    /// Add an order, replacing any order with the same id.
    pub async fn upsert(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.retain(|o| o.id != order.id);
        orders.push(order);
    }

    pub async fn set_fail_on_fetch(&self, fail: bool) {
        *self.fail_on_fetch.write().await = fail;
    }

    /// Delay every fetch, to exercise batch deadlines.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// Number of `fetch_batch` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderSource for MockOrderSource {
    async fn fetch_batch(
        &self,
        since: &Watermark,
        limit: usize,
        filter: OrderFilter,
    ) -> Result<Vec<Order>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_on_fetch.read().await {
            return Err(StatsError::Backend("order source unavailable".to_string()));
        }

        let mut batch: Vec<Order> = self
            .orders
            .read()
            .await
            .iter()
            .filter(|order| filter.accepts(order) && since.precedes(order))
            .cloned()
            .collect();
        batch.sort_by_key(Watermark::of);
        batch.truncate(limit);
        Ok(batch)
    }
}
