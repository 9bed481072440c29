//! Test fixtures.
//!
//! Builders for orders, shared by unit tests, integration tests and the
//! mock backend's callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::model::{CartItem, Order, PhotoSelection, ProductId, SaleTotals};

/// Completion time of order 0 built without an explicit timestamp.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Builds [`Order`] values.
///
/// By default an order is unpaid, completed `id` seconds after
/// [`base_time`], and belongs to session 100.
pub struct OrderBuilder {
    order: Order,
}

impl OrderBuilder {
    pub fn new(id: i64) -> Self {
        let completed_at = base_time() + Duration::seconds(id);
        Self {
            order: Order {
                id,
                session_id: Some(100),
                created_at: completed_at - Duration::hours(1),
                completed_at,
                paid: false,
                cart: Vec::new(),
                photo_selection: BTreeMap::new(),
                totals: SaleTotals::default(),
                defect: None,
            },
        }
    }

    pub fn paid(mut self) -> Self {
        self.order.paid = true;
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.order.completed_at = at;
        self.order.created_at = at - Duration::hours(1);
        self
    }

    pub fn session(mut self, session_id: Option<i64>) -> Self {
        self.order.session_id = session_id;
        self
    }

    /// Add a photo to the selection map.
    pub fn photo(mut self, photo_id: &str, subject_code: &str, background_id: Option<i64>) -> Self {
        self.order.photo_selection.insert(
            photo_id.to_string(),
            PhotoSelection {
                subject_code: subject_code.to_string(),
                background_id,
            },
        );
        self
    }

    /// Add a catalog product cart item selecting `photo_ids`.
    pub fn item(self, product_id: i64, quantity: i64, photo_ids: &[&str]) -> Self {
        self.cart_item(ProductId::Catalog(product_id), quantity, photo_ids)
    }

    /// Add a virtual product cart item selecting `photo_ids`.
    pub fn virtual_item(self, name: &str, quantity: i64, photo_ids: &[&str]) -> Self {
        self.cart_item(ProductId::Virtual(name.to_string()), quantity, photo_ids)
    }

    fn cart_item(mut self, product_id: ProductId, quantity: i64, photo_ids: &[&str]) -> Self {
        self.order.cart.push(CartItem {
            product_id,
            quantity,
            photo_ids: photo_ids.iter().map(|id| id.to_string()).collect(),
        });
        self
    }

    pub fn totals(mut self, totals: SaleTotals) -> Self {
        self.order.totals = totals;
        self
    }

    /// Mark the order as undecodable.
    pub fn defect(mut self, defect: &str) -> Self {
        self.order.defect = Some(defect.to_string());
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}
