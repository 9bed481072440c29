//! Error type shared by every storage and pipeline component.

use std::time::Duration;

use crate::model::{CheckpointKey, LockKey};

/// Result type for storage and pipeline operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur while compiling statistics.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// Another transaction holds the pipeline's lock. Expected when runs overlap.
    #[error("Lock not acquired: {0}")]
    LockNotAcquired(LockKey),

    #[error("Malformed order {order_id}: {reason}")]
    MalformedOrder { order_id: i64, reason: String },

    #[error("Invalid checkpoint {key}: {reason}")]
    InvalidCheckpoint { key: CheckpointKey, reason: String },

    #[cfg(any(feature = "postgres", feature = "sqlite"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(any(feature = "postgres", feature = "sqlite"))]
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Unknown storage type: {0}")]
    UnknownStorage(String),

    #[error("Batch exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl StatsError {
    /// Order-level faults: retrying the same order can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, StatsError::MalformedOrder { .. })
    }

    pub fn is_lock_not_acquired(&self) -> bool {
        matches!(self, StatsError::LockNotAcquired(_))
    }

    /// Serialization failures and deadlocks (SQLSTATE 40001, 40P01): the
    /// batch was rolled back by the database and can be retried at once.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            #[cfg(any(feature = "postgres", feature = "sqlite"))]
            StatsError::Database(sqlx::Error::Database(e)) => {
                matches!(e.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}
