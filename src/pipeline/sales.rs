//! Sales aggregation.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use super::Aggregator;
use crate::interfaces::{FactRepository, Result, StatsError};
use crate::model::{Order, PipelineKind, ProductId, SalesFact, SalesProductFact};

/// Subject and product counts of one order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SalesBreakdown {
    /// Distinct subjects shown on photos some cart item uses.
    pub number_of_subjects: i64,
    /// Product -> units sold. An item with N photos sells N times its
    /// quantity; an item without photos sells its quantity once.
    pub products: BTreeMap<ProductId, i64>,
}

impl SalesBreakdown {
    pub fn from_order(order: &Order) -> Result<Self> {
        order.validate()?;

        let mut subjects = BTreeSet::new();
        let mut products: BTreeMap<ProductId, i64> = BTreeMap::new();
        for item in &order.cart {
            let mut photos = 0i64;
            for selection in order.selections_of(item) {
                subjects.insert(selection.subject_code.as_str());
                photos += 1;
            }

            let units = item
                .quantity
                .checked_mul(photos.max(1))
                .ok_or_else(|| overflow(order, &item.product_id))?;
            let total = products.entry(item.product_id.clone()).or_insert(0);
            *total = total
                .checked_add(units)
                .ok_or_else(|| overflow(order, &item.product_id))?;
        }

        Ok(Self {
            number_of_subjects: subjects.len() as i64,
            products,
        })
    }

    pub fn product_facts(&self) -> Vec<SalesProductFact> {
        self.products
            .iter()
            .map(|(product_id, quantity)| SalesProductFact {
                product_id: product_id.clone(),
                quantity: *quantity,
            })
            .collect()
    }
}

fn overflow(order: &Order, product_id: &ProductId) -> StatsError {
    StatsError::MalformedOrder {
        order_id: order.id,
        reason: format!("quantity of product {} overflows", product_id),
    }
}

/// Sales fact row of an order.
///
/// Taxes include the shipping tax. The rebate only counts when a promo was
/// applied. Returns are not tracked yet and stay zero.
pub fn sales_fact(
    order: &Order,
    date: NaiveDate,
    breakdown: &SalesBreakdown,
) -> Result<SalesFact> {
    let totals = &order.totals;
    let taxes = totals
        .taxes
        .checked_add(totals.shipping_tax)
        .ok_or_else(|| StatsError::MalformedOrder {
            order_id: order.id,
            reason: "taxes overflow".to_string(),
        })?;
    Ok(SalesFact {
        date,
        order_id: order.id,
        session_id: order.session_id,
        number_of_subjects: breakdown.number_of_subjects,
        subtotal: totals.subtotal,
        shipping: totals.shipping,
        promo_rebate: if totals.promo_applied {
            totals.promo_rebate
        } else {
            0
        },
        taxes,
        returns: 0,
        return_fees: 0,
        total: totals.total,
    })
}

/// Records one sales fact per paid order, with its product quantities.
///
/// Both writes replace earlier values for the same order, so reprocessing
/// converges on the latest computation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SalesStatsAggregator;

#[async_trait]
impl Aggregator for SalesStatsAggregator {
    fn kind(&self) -> PipelineKind {
        PipelineKind::SalesStats
    }

    async fn aggregate(&self, facts: &mut dyn FactRepository, order: &Order) -> Result<()> {
        if !order.paid {
            debug!(order_id = order.id, "Skipping unpaid order");
            return Ok(());
        }

        let breakdown = SalesBreakdown::from_order(order)?;
        let date = facts.day_bucket(order.completed_at).await?;
        let fact = sales_fact(order, date, &breakdown)?;

        facts.upsert_sales_fact(&fact).await?;
        facts
            .replace_sales_products(date, order.id, &breakdown.product_facts())
            .await?;
        Ok(())
    }
}
