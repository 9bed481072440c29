//! Mock storage implementations for testing.
//!
//! Also usable as a throwaway single-process backend: locks go through the
//! in-process registry and nothing survives the process.

mod order_source;
mod stats_store;

pub use order_source::MockOrderSource;
pub use stats_store::{MockState, MockStatsStore, MockStatsTransaction};
