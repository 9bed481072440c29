//! studio-stats-worker: Statistics compilation worker
//!
//! Drains the background-usage and sales pipelines on a fixed interval,
//! against the configured database.
//!
//! ## Architecture
//! ```text
//! [orders table] --> [studio-stats-worker] --> [background_stats, sales_stats]
//!                            |
//!                            v
//!                       [checkpoints]
//! ```
//!
//! ## Configuration
//! - STATS_CONFIG: Path to a YAML config file (optional)
//! - STATS__STORAGE__TYPE: `sqlite` (default) or `postgres`
//! - STATS__PIPELINE__SCHEDULE_INTERVAL_SECS: Seconds between cycles (default: 60)
//! - STATS_RUN_ONCE: Run one cycle and exit
//! - STATS_LOG: Log filter (default: info)

use tracing::info;

use studio_stats::config::Config;
use studio_stats::pipeline::{RunOutcome, StatsCompiler, StatsScheduler};
use studio_stats::storage::init_storage;
use studio_stats::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    let storage = init_storage(&config.storage).await?;

    let compiler = StatsCompiler::new(
        storage.stats,
        storage.orders,
        config.pipeline.driver_settings(),
    );
    let scheduler = StatsScheduler::new(compiler, config.pipeline.clone());

    if Config::run_once() {
        info!("studio-stats-worker running a single cycle");
        let reports = scheduler.run_cycle().await;
        let failed: Vec<_> = reports
            .iter()
            .filter(|report| matches!(report.outcome, RunOutcome::Failed(_)))
            .map(|report| report.pipeline.to_string())
            .collect();
        if !failed.is_empty() {
            return Err(format!("pipelines failed: {}", failed.join(", ")).into());
        }
        return Ok(());
    }

    info!("studio-stats-worker started");
    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
