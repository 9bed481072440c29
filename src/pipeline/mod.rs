//! Statistics pipelines.
//!
//! Each pipeline pairs an [`Aggregator`] (per-order fact derivation) with the
//! shared [`PipelineDriver`] loop: fetch a batch past the watermark, apply the
//! aggregator inside one locked transaction, advance the watermark, commit.

use async_trait::async_trait;

use crate::interfaces::{FactRepository, Result};
use crate::model::{Order, PipelineKind};

pub mod background;
pub mod checkpoint;
pub mod compiler;
pub mod driver;
pub mod sales;
pub mod scheduler;

pub use background::{BackgroundStatsAggregator, BackgroundUsage};
pub use compiler::StatsCompiler;
pub use driver::{DriverSettings, PipelineDriver, RunOutcome, RunReport, DEFAULT_BATCH_SIZE};
pub use sales::{SalesBreakdown, SalesStatsAggregator};
pub use scheduler::StatsScheduler;

/// Per-order fact derivation for one pipeline.
///
/// Implementations must reject malformed orders with a permanent error
/// before writing anything, so the driver can dead-letter them without
/// leaving partial facts behind.
#[async_trait]
pub trait Aggregator: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// Write the facts of one order through `facts`.
    async fn aggregate(&self, facts: &mut dyn FactRepository, order: &Order) -> Result<()>;
}
