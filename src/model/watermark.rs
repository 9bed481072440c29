//! Processing watermark.

use chrono::{DateTime, SecondsFormat, Utc};

use super::Order;

/// Boundary between processed and unprocessed orders.
///
/// Ordered by completion timestamp first, then order id, matching the
/// order in which the source returns orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark {
    pub completed_at: DateTime<Utc>,
    pub order_id: i64,
}

impl Watermark {
    pub fn new(completed_at: DateTime<Utc>, order_id: i64) -> Self {
        Self {
            completed_at,
            order_id,
        }
    }

    /// Watermark before any order: the Unix epoch and order id 0.
    pub fn origin() -> Self {
        Self::new(DateTime::<Utc>::default(), 0)
    }

    pub fn of(order: &Order) -> Self {
        Self::new(order.completed_at, order.id)
    }

    /// Whether `order` lies strictly after this watermark.
    pub fn precedes(&self, order: &Order) -> bool {
        Watermark::of(order) > *self
    }

    /// Advance past every order of a batch. Never moves backwards.
    pub fn advance<'a>(self, batch: impl IntoIterator<Item = &'a Order>) -> Self {
        batch.into_iter().map(Watermark::of).fold(self, Ord::max)
    }

    /// Canonical text form of the timestamp, used in checkpoints and SQL
    /// literals. Fixed width, so text order equals time order.
    pub fn timestamp_text(&self) -> String {
        format_timestamp(&self.completed_at)
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::origin()
    }
}

/// RFC 3339, UTC, microsecond precision.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
