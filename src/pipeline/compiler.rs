//! Entry points of the statistics pipelines.

use std::sync::Arc;

use super::{
    Aggregator, BackgroundStatsAggregator, DriverSettings, PipelineDriver, RunReport,
    SalesStatsAggregator,
};
use crate::interfaces::{OrderSource, StatsStore};
use crate::model::PipelineKind;

/// Compiles background-usage and sales statistics from completed orders.
///
/// Cheap to clone; every clone shares the same store and order source.
#[derive(Clone)]
pub struct StatsCompiler {
    store: Arc<dyn StatsStore>,
    orders: Arc<dyn OrderSource>,
    settings: DriverSettings,
}

impl StatsCompiler {
    pub fn new(
        store: Arc<dyn StatsStore>,
        orders: Arc<dyn OrderSource>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            store,
            orders,
            settings,
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn driver(&self, kind: PipelineKind) -> PipelineDriver {
        let aggregator: Arc<dyn Aggregator> = match kind {
            PipelineKind::BackgroundStats => Arc::new(BackgroundStatsAggregator),
            PipelineKind::SalesStats => Arc::new(SalesStatsAggregator),
        };
        PipelineDriver::new(
            aggregator,
            Arc::clone(&self.store),
            Arc::clone(&self.orders),
            self.settings.clone(),
        )
    }

    /// Drain the background-usage backlog.
    pub async fn compile_background_stats(&self) -> RunReport {
        self.driver(PipelineKind::BackgroundStats).run().await
    }

    /// Drain the sales backlog.
    pub async fn compile_sales_stats(&self) -> RunReport {
        self.driver(PipelineKind::SalesStats).run().await
    }
}
