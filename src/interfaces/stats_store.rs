//! Transactional access to the statistics database.

use async_trait::async_trait;
use serde_json::Value;

use super::{AdvisoryLock, CheckpointStore, FactRepository, Result};
use crate::model::CheckpointKey;

/// One open batch transaction.
///
/// Opened at an isolation level where the batch is atomic, with constraint
/// checks deferred to commit so parent and child fact rows may be written in
/// any order. Dropping the handle without committing rolls it back.
#[async_trait]
pub trait StatsTransaction: CheckpointStore + AdvisoryLock + FactRepository {
    /// The transaction as a fact repository, for the aggregators.
    fn facts(&mut self) -> &mut dyn FactRepository;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Entry point to a statistics backend.
///
/// Implementations:
/// - `PostgresStatsStore`: PostgreSQL, safe across processes
/// - `SqliteStatsStore`: SQLite, single instance
/// - `MockStatsStore`: In-memory mock for testing
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Open a batch transaction.
    async fn begin(&self) -> Result<Box<dyn StatsTransaction>>;

    /// Read a committed checkpoint outside any batch transaction.
    async fn read_checkpoint(&self, key: CheckpointKey) -> Result<Option<Value>>;
}
