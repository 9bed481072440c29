//! Studio statistics
//!
//! Incrementally compiles background-usage and sales statistics from
//! completed studio orders. Each pipeline resumes from a persisted
//! watermark, takes an advisory lock so only one runner advances it, and
//! commits its facts together with the new watermark.

pub mod config;
pub mod interfaces;
pub mod model;
pub mod pipeline;
pub mod storage;
pub mod test_utils;
pub mod utils;
