//! Orders as read from the order source.
//!
//! Cart contents and photo selections arrive as JSON documents; the types
//! here mirror that layout (camelCase keys).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interfaces::{Result, StatsError};

/// Product reference carried by a cart item.
///
/// Catalog products are rows of the products table. Virtual products are
/// synthetic items (prints bundles, retouching fees, ...) identified by text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawProductId", into = "RawProductId")]
pub enum ProductId {
    Catalog(i64),
    Virtual(String),
}

impl ProductId {
    /// Numeric id when the product exists in the catalog.
    pub fn catalog_id(&self) -> Option<i64> {
        match self {
            ProductId::Catalog(id) => Some(*id),
            ProductId::Virtual(_) => None,
        }
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        match value.trim().parse::<i64>() {
            Ok(id) => ProductId::Catalog(id),
            Err(_) => ProductId::Virtual(value.to_string()),
        }
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        ProductId::Catalog(value)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Catalog(id) => write!(f, "{}", id),
            ProductId::Virtual(name) => f.write_str(name),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawProductId {
    Number(i64),
    Text(String),
}

impl From<RawProductId> for ProductId {
    fn from(raw: RawProductId) -> Self {
        match raw {
            RawProductId::Number(id) => ProductId::Catalog(id),
            RawProductId::Text(text) => ProductId::from(text.as_str()),
        }
    }
}

impl From<ProductId> for RawProductId {
    fn from(id: ProductId) -> Self {
        match id {
            ProductId::Catalog(id) => RawProductId::Number(id),
            ProductId::Virtual(name) => RawProductId::Text(name),
        }
    }
}

fn default_quantity() -> i64 {
    1
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Keys into the order's photo-selection map.
    #[serde(default)]
    pub photo_ids: Vec<String>,
}

/// A photo the customer picked, with the subject it shows and the
/// background it was shot on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSelection {
    pub subject_code: String,
    #[serde(default)]
    pub background_id: Option<i64>,
}

/// Totals computed at checkout, in cents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: i64,
    pub shipping: i64,
    pub shipping_tax: i64,
    pub taxes: i64,
    pub promo_rebate: i64,
    pub promo_applied: bool,
    pub total: i64,
}

/// A completed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub session_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub paid: bool,
    pub cart: Vec<CartItem>,
    /// Photo id -> selection.
    pub photo_selection: BTreeMap<String, PhotoSelection>,
    pub totals: SaleTotals,
    /// Set when the stored order could not be decoded. Such an order is
    /// malformed whatever its other fields say.
    pub defect: Option<String>,
}

impl Order {
    /// Check the cart against the photo selection.
    ///
    /// Failures are order-level faults: retrying them never succeeds.
    pub fn validate(&self) -> Result<()> {
        if let Some(defect) = &self.defect {
            return Err(self.malformed(defect.clone()));
        }
        for item in &self.cart {
            if item.quantity <= 0 {
                return Err(self.malformed(format!(
                    "product {} has quantity {}",
                    item.product_id, item.quantity
                )));
            }
            if let ProductId::Virtual(name) = &item.product_id {
                if name.trim().is_empty() {
                    return Err(self.malformed("cart item without product id".to_string()));
                }
            }
            for photo_id in &item.photo_ids {
                if !self.photo_selection.contains_key(photo_id) {
                    return Err(self.malformed(format!(
                        "product {} references unknown photo {}",
                        item.product_id, photo_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Selections of one cart item, in cart order.
    ///
    /// Unknown photo ids are skipped; call [`Order::validate`] first to
    /// reject them instead.
    pub fn selections_of<'a>(
        &'a self,
        item: &'a CartItem,
    ) -> impl Iterator<Item = &'a PhotoSelection> + 'a {
        item.photo_ids
            .iter()
            .filter_map(move |photo_id| self.photo_selection.get(photo_id))
    }

    fn malformed(&self, reason: String) -> StatsError {
        StatsError::MalformedOrder {
            order_id: self.id,
            reason,
        }
    }
}

/// Which completed orders a pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    /// Every completed order, paid or not.
    Completed,
    /// Completed and paid orders only.
    Paid,
}

impl OrderFilter {
    pub fn accepts(&self, order: &Order) -> bool {
        match self {
            OrderFilter::Completed => true,
            OrderFilter::Paid => order.paid,
        }
    }
}
