//! Mock StatsStore implementation for testing.
//!
//! Transactions stage their writes and replay them onto the shared state on
//! commit, so concurrent transactions of different pipelines do not clobber
//! each other and a rollback (or drop) leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::interfaces::{
    AdvisoryLock, CheckpointStore, FactRepository, Result, StatsError, StatsStore,
    StatsTransaction,
};
use crate::model::{
    BackgroundStat, CheckpointKey, DeadLetter, LockKey, ProductId, SalesFact, SalesProductFact,
};
use crate::storage::locks::{HeldLocks, LocalLockRegistry};

/// Committed contents of the mock database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockState {
    pub checkpoints: BTreeMap<CheckpointKey, Value>,
    pub background_stats: BTreeMap<(i64, NaiveDate), BackgroundStat>,
    /// (background, date, order)
    pub background_orders: BTreeSet<(i64, NaiveDate, i64)>,
    /// (background, date, product)
    pub background_products: BTreeSet<(i64, NaiveDate, i64)>,
    pub sales_stats: BTreeMap<(NaiveDate, i64), SalesFact>,
    /// (date, order, product) -> quantity
    pub sales_products: BTreeMap<(NaiveDate, i64, ProductId), i64>,
    /// (pipeline, order) -> reason
    pub dead_letters: BTreeMap<(String, i64), String>,
}

impl MockState {
    /// Product rows of one sales fact.
    pub fn sales_products_of(&self, date: NaiveDate, order_id: i64) -> Vec<SalesProductFact> {
        self.sales_products
            .iter()
            .filter(|((d, o, _), _)| *d == date && *o == order_id)
            .map(|((_, _, product_id), quantity)| SalesProductFact {
                product_id: product_id.clone(),
                quantity: *quantity,
            })
            .collect()
    }

    fn apply(&mut self, write: &MockWrite) {
        match write {
            MockWrite::Checkpoint(key, value) => {
                self.checkpoints.insert(*key, value.clone());
            }
            MockWrite::BackgroundUsage {
                background_id,
                date,
                usage,
                conversions,
            } => {
                let stat = self
                    .background_stats
                    .entry((*background_id, *date))
                    .or_default();
                stat.usage_count += usage;
                stat.conversion_count += conversions;
            }
            MockWrite::BackgroundOrder(background_id, date, order_id) => {
                self.background_orders
                    .insert((*background_id, *date, *order_id));
            }
            MockWrite::BackgroundProduct(background_id, date, product_id) => {
                self.background_products
                    .insert((*background_id, *date, *product_id));
            }
            MockWrite::SalesFact(fact) => {
                self.sales_stats
                    .insert((fact.date, fact.order_id), fact.clone());
            }
            MockWrite::SalesProducts {
                date,
                order_id,
                products,
            } => {
                self.sales_products
                    .retain(|(d, o, _), _| !(d == date && o == order_id));
                for product in products {
                    self.sales_products
                        .insert((*date, *order_id, product.product_id.clone()), product.quantity);
                }
            }
            MockWrite::DeadLetter(letter) => {
                self.dead_letters.insert(
                    (letter.pipeline.name().to_string(), letter.order_id),
                    letter.reason.clone(),
                );
            }
        }
    }
}

#[derive(Debug, Clone)]
enum MockWrite {
    Checkpoint(CheckpointKey, Value),
    BackgroundUsage {
        background_id: i64,
        date: NaiveDate,
        usage: i64,
        conversions: i64,
    },
    BackgroundOrder(i64, NaiveDate, i64),
    BackgroundProduct(i64, NaiveDate, i64),
    SalesFact(SalesFact),
    SalesProducts {
        date: NaiveDate,
        order_id: i64,
        products: Vec<SalesProductFact>,
    },
    DeadLetter(DeadLetter),
}

/// Mock statistics store that keeps everything in memory.
#[derive(Default)]
pub struct MockStatsStore {
    state: Arc<RwLock<MockState>>,
    locks: LocalLockRegistry,
    fail_on_order: Arc<RwLock<Option<i64>>>,
}

impl MockStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fact write touching `order_id` fail with a backend error.
    pub async fn set_fail_on_order(&self, order_id: Option<i64>) {
        *self.fail_on_order.write().await = order_id;
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> MockState {
        self.state.read().await.clone()
    }

    pub async fn background_stat(&self, background_id: i64, date: NaiveDate) -> Option<BackgroundStat> {
        self.state
            .read()
            .await
            .background_stats
            .get(&(background_id, date))
            .copied()
    }

    pub async fn checkpoint(&self, key: CheckpointKey) -> Option<Value> {
        self.state.read().await.checkpoints.get(&key).cloned()
    }

    /// Forget every watermark, so the next run reprocesses all orders.
    pub async fn clear_checkpoints(&self) {
        self.state.write().await.checkpoints.clear();
    }
}

#[async_trait]
impl StatsStore for MockStatsStore {
    async fn begin(&self) -> Result<Box<dyn StatsTransaction>> {
        Ok(Box::new(MockStatsTransaction {
            committed: Arc::clone(&self.state),
            view: self.state.read().await.clone(),
            pending: Vec::new(),
            locks: self.locks.clone(),
            held: HeldLocks::default(),
            fail_on_order: *self.fail_on_order.read().await,
        }))
    }

    async fn read_checkpoint(&self, key: CheckpointKey) -> Result<Option<Value>> {
        Ok(self.checkpoint(key).await)
    }
}

/// Open transaction on a [`MockStatsStore`].
pub struct MockStatsTransaction {
    committed: Arc<RwLock<MockState>>,
    /// Committed state as of `begin`, plus this transaction's writes.
    view: MockState,
    pending: Vec<MockWrite>,
    locks: LocalLockRegistry,
    held: HeldLocks,
    fail_on_order: Option<i64>,
}

impl MockStatsTransaction {
    fn write(&mut self, write: MockWrite) {
        self.view.apply(&write);
        self.pending.push(write);
    }

    /// Re-read committed state if nothing was written yet, so a lock taken
    /// after another transaction committed sees that commit.
    async fn refresh_view(&mut self) {
        if self.pending.is_empty() {
            self.view = self.committed.read().await.clone();
        }
    }

    fn check_failure(&self, order_id: i64) -> Result<()> {
        if self.fail_on_order == Some(order_id) {
            return Err(StatsError::Backend(format!(
                "injected failure for order {}",
                order_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for MockStatsTransaction {
    async fn get(&mut self, key: CheckpointKey) -> Result<Option<Value>> {
        Ok(self.view.checkpoints.get(&key).cloned())
    }

    async fn set(&mut self, key: CheckpointKey, value: &Value) -> Result<()> {
        self.write(MockWrite::Checkpoint(key, value.clone()));
        Ok(())
    }
}

#[async_trait]
impl AdvisoryLock for MockStatsTransaction {
    async fn try_acquire(&mut self, key: LockKey) -> Result<()> {
        if !self.held.holds(key) {
            let guard = self.locks.try_acquire(key)?;
            self.held.push(guard);
            self.refresh_view().await;
        }
        Ok(())
    }

    async fn acquire(&mut self, key: LockKey) -> Result<()> {
        if !self.held.holds(key) {
            let guard = self.locks.acquire(key).await;
            self.held.push(guard);
            self.refresh_view().await;
        }
        Ok(())
    }
}

#[async_trait]
impl FactRepository for MockStatsTransaction {
    async fn day_bucket(&mut self, at: DateTime<Utc>) -> Result<NaiveDate> {
        Ok(at.date_naive())
    }

    async fn background_order_recorded(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        order_id: i64,
    ) -> Result<bool> {
        self.check_failure(order_id)?;
        Ok(self
            .view
            .background_orders
            .contains(&(background_id, date, order_id)))
    }

    async fn add_background_usage(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        usage: i64,
        conversions: i64,
    ) -> Result<()> {
        self.write(MockWrite::BackgroundUsage {
            background_id,
            date,
            usage,
            conversions,
        });
        Ok(())
    }

    async fn record_background_order(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        order_id: i64,
    ) -> Result<()> {
        self.check_failure(order_id)?;
        self.write(MockWrite::BackgroundOrder(background_id, date, order_id));
        Ok(())
    }

    async fn record_background_product(
        &mut self,
        background_id: i64,
        date: NaiveDate,
        product_id: i64,
    ) -> Result<()> {
        self.write(MockWrite::BackgroundProduct(background_id, date, product_id));
        Ok(())
    }

    async fn upsert_sales_fact(&mut self, fact: &SalesFact) -> Result<()> {
        self.check_failure(fact.order_id)?;
        self.write(MockWrite::SalesFact(fact.clone()));
        Ok(())
    }

    async fn replace_sales_products(
        &mut self,
        date: NaiveDate,
        order_id: i64,
        products: &[SalesProductFact],
    ) -> Result<()> {
        self.write(MockWrite::SalesProducts {
            date,
            order_id,
            products: products.to_vec(),
        });
        Ok(())
    }

    async fn record_dead_letter(&mut self, letter: &DeadLetter) -> Result<()> {
        self.write(MockWrite::DeadLetter(letter.clone()));
        Ok(())
    }
}

#[async_trait]
impl StatsTransaction for MockStatsTransaction {
    fn facts(&mut self) -> &mut dyn FactRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut state = self.committed.write().await;
        for write in &self.pending {
            state.apply(write);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
