//! Plain data types shared by the pipelines and the storage backends.

mod facts;
mod keys;
mod order;
mod watermark;

pub use facts::{BackgroundStat, DeadLetter, SalesFact, SalesProductFact};
pub use keys::{CheckpointKey, LockKey, PipelineKind};
pub use order::{CartItem, Order, OrderFilter, PhotoSelection, ProductId, SaleTotals};
pub use watermark::{format_timestamp, Watermark};
