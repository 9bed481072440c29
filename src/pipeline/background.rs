//! Background-usage aggregation.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::debug;

use super::Aggregator;
use crate::interfaces::{FactRepository, Result};
use crate::model::{Order, PipelineKind, ProductId};

/// Backgrounds an order used, each with the products it was printed on.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BackgroundUsage {
    pub by_background: BTreeMap<i64, BTreeSet<ProductId>>,
}

impl BackgroundUsage {
    pub fn from_order(order: &Order) -> Result<Self> {
        order.validate()?;

        let mut by_background: BTreeMap<i64, BTreeSet<ProductId>> = BTreeMap::new();
        for item in &order.cart {
            for selection in order.selections_of(item) {
                if let Some(background_id) = selection.background_id {
                    by_background
                        .entry(background_id)
                        .or_default()
                        .insert(item.product_id.clone());
                }
            }
        }
        Ok(Self { by_background })
    }

    pub fn is_empty(&self) -> bool {
        self.by_background.is_empty()
    }

    /// Distinct (background, product) pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (i64, &ProductId)> {
        self.by_background
            .iter()
            .flat_map(|(background_id, products)| products.iter().map(|p| (*background_id, p)))
    }
}

/// Counts background usage and conversions per day.
///
/// Every completed order counts once per background it used; paid orders
/// also count as a conversion. An order already associated with a
/// background on that day is not counted again, so reprocessing is safe.
/// Runs under the pipeline lock, which makes it the only writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackgroundStatsAggregator;

#[async_trait]
impl Aggregator for BackgroundStatsAggregator {
    fn kind(&self) -> PipelineKind {
        PipelineKind::BackgroundStats
    }

    async fn aggregate(&self, facts: &mut dyn FactRepository, order: &Order) -> Result<()> {
        let usage = BackgroundUsage::from_order(order)?;
        if usage.is_empty() {
            return Ok(());
        }

        let date = facts.day_bucket(order.completed_at).await?;
        let conversions = i64::from(order.paid);

        for (background_id, products) in &usage.by_background {
            let background_id = *background_id;
            if facts
                .background_order_recorded(background_id, date, order.id)
                .await?
            {
                debug!(
                    order_id = order.id,
                    background_id, "Order already counted for background"
                );
            } else {
                facts
                    .add_background_usage(background_id, date, 1, conversions)
                    .await?;
                facts
                    .record_background_order(background_id, date, order.id)
                    .await?;
            }

            // Virtual products have no catalog row to reference.
            for product_id in products.iter().filter_map(ProductId::catalog_id) {
                facts
                    .record_background_product(background_id, date, product_id)
                    .await?;
            }
        }
        Ok(())
    }
}
