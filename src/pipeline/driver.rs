//! The batch loop shared by every pipeline.
//!
//! One iteration:
//! 1. Read the committed watermark.
//! 2. Fetch up to `batch_size` orders past it. An empty batch ends the run.
//! 3. Begin a transaction and take the pipeline's advisory lock without
//!    waiting. A held lock ends the run quietly.
//! 4. Re-read the watermark under the lock. If another runner moved it
//!    since step 1, roll back and start over.
//! 5. Aggregate every order. Malformed orders are dead-lettered, any other
//!    error rolls the whole batch back and ends the run.
//! 6. Write the advanced watermark and commit.
//!
//! Each iteration is bounded by `batch_timeout`. Expiry drops the
//! transaction, which rolls it back. Serialization failures are retried a
//! few times before the run gives up.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use tracing::{debug, error, info, warn};

use super::{checkpoint, Aggregator};
use crate::interfaces::{
    AdvisoryLock, FactRepository, OrderSource, Result, StatsError, StatsStore, StatsTransaction,
};
use crate::model::{DeadLetter, Order, PipelineKind, Watermark};
use crate::utils::retry::{conflict_backoff, MAX_CONFLICT_RETRIES};

/// Orders per batch transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upper bound on one batch transaction.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every available order was processed.
    Drained,
    /// Another runner holds the pipeline lock.
    LockHeld,
    /// A batch exceeded its deadline and was rolled back.
    TimedOut,
    /// A batch failed and was rolled back.
    Failed(String),
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub pipeline: PipelineKind,
    /// Committed batches.
    pub batches: u32,
    /// Orders in committed batches, dead letters included.
    pub orders: u64,
    pub dead_lettered: u64,
    /// Watermark after the last committed batch, if any committed.
    pub watermark: Option<Watermark>,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn new(pipeline: PipelineKind) -> Self {
        Self {
            pipeline,
            batches: 0,
            orders: 0,
            dead_lettered: 0,
            watermark: None,
            outcome: RunOutcome::Drained,
        }
    }
}

enum BatchStep {
    Empty,
    Stale,
    Committed {
        orders: usize,
        dead_lettered: usize,
        watermark: Watermark,
    },
}

/// Drives one pipeline until its backlog is drained.
pub struct PipelineDriver {
    aggregator: Arc<dyn Aggregator>,
    store: Arc<dyn StatsStore>,
    orders: Arc<dyn OrderSource>,
    settings: DriverSettings,
}

impl PipelineDriver {
    pub fn new(
        aggregator: Arc<dyn Aggregator>,
        store: Arc<dyn StatsStore>,
        orders: Arc<dyn OrderSource>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            aggregator,
            store,
            orders,
            settings,
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.aggregator.kind()
    }

    /// Process batches until one comes back empty.
    ///
    /// Never fails: errors end the run and are reported in the outcome.
    pub async fn run(&self) -> RunReport {
        let kind = self.kind();
        let mut report = RunReport::new(kind);
        let mut conflicts = 0;
        let mut backoff = conflict_backoff().build();
        debug!(pipeline = %kind, "Compiling statistics");

        report.outcome = loop {
            let step = match tokio::time::timeout(self.settings.batch_timeout, self.run_batch())
                .await
            {
                Ok(step) => step,
                Err(_) => Err(StatsError::DeadlineExceeded(self.settings.batch_timeout)),
            };

            match step {
                Ok(BatchStep::Empty) => break RunOutcome::Drained,
                Ok(BatchStep::Stale) => {
                    debug!(pipeline = %kind, "Watermark moved by another runner, refetching");
                }
                Ok(BatchStep::Committed {
                    orders,
                    dead_lettered,
                    watermark,
                }) => {
                    conflicts = 0;
                    backoff = conflict_backoff().build();
                    report.batches += 1;
                    report.orders += orders as u64;
                    report.dead_lettered += dead_lettered as u64;
                    report.watermark = Some(watermark);
                    info!(
                        pipeline = %kind,
                        orders,
                        dead_lettered,
                        watermark_at = %watermark.timestamp_text(),
                        watermark_order_id = watermark.order_id,
                        "Committed batch"
                    );
                }
                Err(StatsError::LockNotAcquired(key)) => {
                    info!(pipeline = %kind, lock = %key, "Pipeline already running elsewhere, skipping");
                    break RunOutcome::LockHeld;
                }
                Err(StatsError::DeadlineExceeded(limit)) => {
                    warn!(pipeline = %kind, limit = ?limit, "Batch exceeded deadline, rolled back");
                    break RunOutcome::TimedOut;
                }
                Err(e) if e.is_serialization_failure() && conflicts < MAX_CONFLICT_RETRIES => {
                    conflicts += 1;
                    let delay = backoff.next().unwrap_or_default();
                    debug!(pipeline = %kind, attempt = conflicts, delay = ?delay, error = %e, "Serialization conflict, retrying batch");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(pipeline = %kind, error = %e, "Batch failed, rolled back");
                    break RunOutcome::Failed(e.to_string());
                }
            }
        };

        if report.batches > 0 {
            info!(
                pipeline = %kind,
                batches = report.batches,
                orders = report.orders,
                dead_lettered = report.dead_lettered,
                outcome = ?report.outcome,
                "Statistics run finished"
            );
        }
        report
    }

    async fn run_batch(&self) -> Result<BatchStep> {
        let kind = self.kind();
        let since = checkpoint::load_watermark(self.store.as_ref(), kind).await?;
        let batch = self
            .orders
            .fetch_batch(&since, self.settings.batch_size, kind.order_filter())
            .await?;
        if batch.is_empty() {
            return Ok(BatchStep::Empty);
        }
        debug!(pipeline = %kind, orders = batch.len(), "Fetched batch");

        let mut tx = self.store.begin().await?;
        let processed = self.process(tx.as_mut(), since, &batch).await;
        match processed {
            Ok(step @ BatchStep::Committed { .. }) => {
                tx.commit().await?;
                Ok(step)
            }
            Ok(step) => {
                tx.rollback().await?;
                Ok(step)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(pipeline = %kind, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        tx: &mut dyn StatsTransaction,
        since: Watermark,
        batch: &[Order],
    ) -> Result<BatchStep> {
        let kind = self.kind();
        tx.try_acquire(kind.lock_key()).await?;

        if checkpoint::read_watermark(tx, kind).await? != since {
            return Ok(BatchStep::Stale);
        }

        let mut dead_lettered = 0;
        for order in batch {
            match self.aggregator.aggregate(tx.facts(), order).await {
                Ok(()) => {}
                Err(e) if e.is_permanent() => {
                    warn!(pipeline = %kind, order_id = order.id, error = %e, "Dead-lettering order");
                    tx.record_dead_letter(&DeadLetter::new(kind, order.id, e.to_string()))
                        .await?;
                    dead_lettered += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let watermark = since.advance(batch);
        checkpoint::write_watermark(tx, kind, &watermark).await?;
        Ok(BatchStep::Committed {
            orders: batch.len(),
            dead_lettered,
            watermark,
        })
    }
}
