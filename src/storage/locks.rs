//! In-process advisory locks.
//!
//! Stand-in for database advisory locks where the backend has none (SQLite,
//! mock). Guards are owned by a transaction and released when it ends, so the
//! scope matches `pg_advisory_xact_lock`. Only excludes runners sharing the
//! same registry, i.e. the same process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::interfaces::{Result, StatsError};
use crate::model::LockKey;

/// Registry of lock slots, one per lock id. Clones share slots.
#[derive(Clone, Default)]
pub struct LocalLockRegistry {
    slots: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

/// A granted lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LocalLockGuard {
    key: LockKey,
    _guard: OwnedMutexGuard<()>,
}

impl LocalLockGuard {
    pub fn key(&self) -> LockKey {
        self.key
    }
}

impl LocalLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.id()).or_default().clone()
    }

    /// Grant the lock if free, fail with `LockNotAcquired` otherwise.
    pub fn try_acquire(&self, key: LockKey) -> Result<LocalLockGuard> {
        let guard = self
            .slot(key)
            .try_lock_owned()
            .map_err(|_| StatsError::LockNotAcquired(key))?;
        debug!(lock = %key, "Local lock acquired");
        Ok(LocalLockGuard { key, _guard: guard })
    }

    /// Wait for the lock.
    pub async fn acquire(&self, key: LockKey) -> LocalLockGuard {
        let guard = self.slot(key).lock_owned().await;
        debug!(lock = %key, "Local lock acquired after wait");
        LocalLockGuard { key, _guard: guard }
    }
}

/// Locks held by one transaction.
#[derive(Debug, Default)]
pub struct HeldLocks {
    guards: Vec<LocalLockGuard>,
}

impl HeldLocks {
    /// Whether this transaction already holds `key`. Re-acquiring a held lock
    /// succeeds, as it does for database advisory locks.
    pub fn holds(&self, key: LockKey) -> bool {
        self.guards.iter().any(|g| g.key() == key)
    }

    pub fn push(&mut self, guard: LocalLockGuard) {
        self.guards.push(guard);
    }
}
