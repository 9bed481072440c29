//! Checkpoint storage interface.

use async_trait::async_trait;
use serde_json::Value;

use super::Result;
use crate::model::CheckpointKey;

/// Durable key -> JSON value table holding pipeline watermarks.
///
/// Implemented by transaction handles, so reads and writes take part in the
/// caller's atomicity: a checkpoint written next to a batch's facts commits
/// or rolls back with them.
///
/// # Implementations
///
/// - `PostgresStatsTransaction`: PostgreSQL storage
/// - `SqliteStatsTransaction`: SQLite storage
/// - `MockStatsTransaction`: In-memory mock for testing
#[async_trait]
pub trait CheckpointStore: Send {
    /// Read a checkpoint.
    ///
    /// Returns `None` if the key was never set (first run of a pipeline).
    async fn get(&mut self, key: CheckpointKey) -> Result<Option<Value>>;

    /// Write a checkpoint. Last write wins.
    async fn set(&mut self, key: CheckpointKey, value: &Value) -> Result<()>;
}
