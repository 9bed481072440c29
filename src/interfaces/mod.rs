//! Abstract interfaces for studio-stats components.
//!
//! These traits define the contracts for:
//! - Checkpoint storage (resumable watermarks)
//! - Advisory locking (one runner per pipeline)
//! - Fact storage (rollup tables)
//! - Order source (read-only input feed)
//! - Statistics store (batch transactions tying the above together)

pub mod advisory_lock;
pub mod checkpoint_store;
pub mod error;
pub mod fact_repository;
pub mod order_source;
pub mod stats_store;

pub use advisory_lock::AdvisoryLock;
pub use checkpoint_store::CheckpointStore;
pub use error::{Result, StatsError};
pub use fact_repository::FactRepository;
pub use order_source::OrderSource;
pub use stats_store::{StatsStore, StatsTransaction};
