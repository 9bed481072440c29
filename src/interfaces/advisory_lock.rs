//! Transaction-scoped mutual exclusion.

use async_trait::async_trait;

use super::Result;
use crate::model::LockKey;

/// Lock capability of a transaction handle.
///
/// A granted lock lives exactly as long as the transaction: commit, rollback
/// or drop releases it. There is no explicit release.
///
/// # Implementations
///
/// - PostgreSQL: `pg_try_advisory_xact_lock` / `pg_advisory_xact_lock`
/// - SQLite and mock: in-process lock registry (single-instance deployments)
#[async_trait]
pub trait AdvisoryLock: Send {
    /// Acquire without waiting.
    ///
    /// Fails with `StatsError::LockNotAcquired` if another transaction holds
    /// the lock.
    async fn try_acquire(&mut self, key: LockKey) -> Result<()>;

    /// Wait until the lock is granted.
    async fn acquire(&mut self, key: LockKey) -> Result<()>;

    /// Acquire, waiting only when `wait` is set.
    async fn lock(&mut self, key: LockKey, wait: bool) -> Result<()> {
        if wait {
            self.acquire(key).await
        } else {
            self.try_acquire(key).await
        }
    }
}
