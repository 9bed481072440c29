//! Pipeline configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::pipeline::{DriverSettings, DEFAULT_BATCH_SIZE};

/// Batch sizing and scheduling of the statistics pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Orders per batch transaction.
    pub batch_size: usize,
    /// Upper bound on one batch transaction.
    pub batch_timeout_secs: u64,
    /// Seconds between scheduled runs.
    pub schedule_interval_secs: u64,
    pub background_stats_enabled: bool,
    pub sales_stats_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout_secs: 300,
            schedule_interval_secs: 60,
            background_stats_enabled: true,
            sales_stats_enabled: true,
        }
    }
}

impl PipelineConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    /// Never zero; `tokio::time::interval` panics on a zero period.
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs.max(1))
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            batch_size: self.batch_size.max(1),
            batch_timeout: self.batch_timeout(),
        }
    }
}
