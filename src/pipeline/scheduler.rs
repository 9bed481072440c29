//! Periodic statistics compilation.
//!
//! Runs both pipelines concurrently on every tick. A cycle always finishes
//! before shutdown is honored, so no batch is cut short.

use std::future::Future;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use super::{RunOutcome, RunReport, StatsCompiler};
use crate::config::PipelineConfig;

/// Statistics scheduler service.
pub struct StatsScheduler {
    compiler: StatsCompiler,
    config: PipelineConfig,
}

impl StatsScheduler {
    pub fn new(compiler: StatsCompiler, config: PipelineConfig) -> Self {
        Self { compiler, config }
    }

    /// Run every enabled pipeline once, concurrently.
    pub async fn run_cycle(&self) -> Vec<RunReport> {
        let background = async {
            if self.config.background_stats_enabled {
                Some(self.compiler.compile_background_stats().await)
            } else {
                None
            }
        };
        let sales = async {
            if self.config.sales_stats_enabled {
                Some(self.compiler.compile_sales_stats().await)
            } else {
                None
            }
        };

        let (background, sales) = tokio::join!(background, sales);
        background.into_iter().chain(sales).collect()
    }

    /// Run cycles at the configured interval until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            interval = ?self.config.schedule_interval(),
            background_stats = self.config.background_stats_enabled,
            sales_stats = self.config.sales_stats_enabled,
            "Starting statistics scheduler"
        );

        let mut ticker = interval(self.config.schedule_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping statistics scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    for report in self.run_cycle().await {
                        if let RunOutcome::Failed(reason) = &report.outcome {
                            warn!(pipeline = %report.pipeline, reason = %reason, "Cycle left backlog for the next tick");
                        }
                    }
                }
            }
        }
    }
}
