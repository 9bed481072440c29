//! PostgreSQL implementations of storage interfaces.
//!
//! Batches run in SERIALIZABLE transactions with deferred constraints, and
//! pipelines exclude each other with transaction-scoped advisory locks
//! (`pg_try_advisory_xact_lock`), so locks are released by commit or
//! rollback and work across any number of worker processes.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row, Transaction};
use tracing::debug;

use super::sql::{statements, SqlDatabase};
use crate::interfaces::{
    AdvisoryLock, FactRepository, Result, StatsError, StatsStore, StatsTransaction,
};
use crate::model::{CheckpointKey, LockKey};

// Order source uses the unified SQL implementation
pub use super::sql::postgres::PostgresOrderSource;

/// PostgreSQL implementation of StatsStore.
#[derive(Clone)]
pub struct PostgresStatsStore {
    pool: PgPool,
}

impl PostgresStatsStore {
    /// Create a new PostgreSQL stats store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StatsStore for PostgresStatsStore {
    async fn begin(&self) -> Result<Box<dyn StatsTransaction>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        sqlx::query("SET CONSTRAINTS ALL DEFERRED")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PostgresStatsTransaction { tx }))
    }

    async fn read_checkpoint(&self, key: CheckpointKey) -> Result<Option<Value>> {
        let sql = super::sql::postgres::Postgres::build_select(statements::select_checkpoint(key));
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

/// Open batch transaction on PostgreSQL.
pub struct PostgresStatsTransaction {
    pub(crate) tx: Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl AdvisoryLock for PostgresStatsTransaction {
    async fn try_acquire(&mut self, key: LockKey) -> Result<()> {
        let row = sqlx::query("SELECT pg_try_advisory_xact_lock($1) AS acquired")
            .bind(key.id())
            .fetch_one(&mut *self.tx)
            .await?;
        let acquired: bool = row.try_get("acquired")?;
        if !acquired {
            return Err(StatsError::LockNotAcquired(key));
        }
        debug!(lock = %key, "Advisory lock acquired");
        Ok(())
    }

    async fn acquire(&mut self, key: LockKey) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key.id())
            .execute(&mut *self.tx)
            .await?;
        debug!(lock = %key, "Advisory lock acquired after wait");
        Ok(())
    }
}

#[async_trait]
impl StatsTransaction for PostgresStatsTransaction {
    fn facts(&mut self) -> &mut dyn FactRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Read a JSONB column. NULL reads as `Value::Null`.
pub(crate) fn json_column(
    row: &PgRow,
    column: &str,
) -> Result<std::result::Result<Value, String>> {
    let value: Option<sqlx::types::Json<Value>> = row.try_get(column)?;
    Ok(Ok(value.map(|json| json.0).unwrap_or(Value::Null)))
}
