//! SQLite implementations of storage interfaces.
//!
//! SQLite has no advisory locks; pipelines exclude each other through an
//! in-process [`LocalLockRegistry`], which covers the single-process
//! deployments SQLite is meant for. Foreign keys are checked at commit
//! (`defer_foreign_keys`).
//!
//! Timestamps are stored as canonical RFC 3339 text (`format_timestamp`),
//! so that text comparison orders them in time.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, Transaction};

use super::locks::{HeldLocks, LocalLockRegistry};
use super::sql::{statements, SqlDatabase};
use crate::interfaces::{AdvisoryLock, FactRepository, Result, StatsStore, StatsTransaction};
use crate::model::{CheckpointKey, LockKey};

// Order source uses the unified SQL implementation
pub use super::sql::sqlite::SqliteOrderSource;

/// SQLite implementation of StatsStore.
#[derive(Clone)]
pub struct SqliteStatsStore {
    pool: SqlitePool,
    locks: LocalLockRegistry,
}

impl SqliteStatsStore {
    /// Create a new SQLite stats store.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: LocalLockRegistry::new(),
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn begin(&self) -> Result<Box<dyn StatsTransaction>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("PRAGMA defer_foreign_keys = ON")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(SqliteStatsTransaction {
            tx,
            locks: self.locks.clone(),
            held: HeldLocks::default(),
        }))
    }

    async fn read_checkpoint(&self, key: CheckpointKey) -> Result<Option<Value>> {
        let sql = super::sql::sqlite::Sqlite::build_select(statements::select_checkpoint(key));
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let value: sqlx::types::Json<Value> = row.try_get("value")?;
                Ok(Some(value.0))
            }
            None => Ok(None),
        }
    }
}

/// Open batch transaction on SQLite.
///
/// Field order matters: the transaction is dropped (rolled back) before
/// the locks it holds are released.
pub struct SqliteStatsTransaction {
    pub(crate) tx: Transaction<'static, sqlx::Sqlite>,
    locks: LocalLockRegistry,
    held: HeldLocks,
}

#[async_trait]
impl AdvisoryLock for SqliteStatsTransaction {
    async fn try_acquire(&mut self, key: LockKey) -> Result<()> {
        if !self.held.holds(key) {
            let guard = self.locks.try_acquire(key)?;
            self.held.push(guard);
        }
        Ok(())
    }

    async fn acquire(&mut self, key: LockKey) -> Result<()> {
        if !self.held.holds(key) {
            let guard = self.locks.acquire(key).await;
            self.held.push(guard);
        }
        Ok(())
    }
}

#[async_trait]
impl StatsTransaction for SqliteStatsTransaction {
    fn facts(&mut self) -> &mut dyn FactRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await?;
        drop(this.held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.rollback().await?;
        drop(this.held);
        Ok(())
    }
}

/// Read a JSON document stored as TEXT. NULL reads as `Value::Null`;
/// text that is not JSON is returned as the inner error.
pub(crate) fn json_column(
    row: &SqliteRow,
    column: &str,
) -> Result<std::result::Result<Value, String>> {
    let text: Option<String> = row.try_get(column)?;
    Ok(match text {
        Some(text) => serde_json::from_str(&text).map_err(|e| e.to_string()),
        None => Ok(Value::Null),
    })
}
