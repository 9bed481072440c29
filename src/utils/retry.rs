//! Backoff builders for retried database work.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Consecutive serialization failures retried before a run gives up.
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// Backoff for database connections at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

/// Backoff between retries of a batch that lost a serialization conflict.
///
/// - Min delay: 10ms
/// - Max delay: 500ms
/// - Max attempts: [`MAX_CONFLICT_RETRIES`]
/// - Jitter enabled
pub fn conflict_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(500))
        .with_max_times(MAX_CONFLICT_RETRIES)
        .with_jitter()
}
