//! Bootstrap utilities for the stats worker.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::retry::connection_backoff;
use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the STATS_LOG environment variable.
///
/// Defaults to "info" level if STATS_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect to a database with exponential backoff retry.
///
/// # Arguments
/// * `service_name` - Human-readable name for logging (e.g., "postgres")
/// * `address` - The address to connect to, for logging
/// * `connect` - Async function that attempts to establish a connection
///
/// # Returns
/// The connection on success, or the last error after max retries.
pub async fn connect_with_retry<T, E, F, Fut>(
    service_name: &str,
    address: &str,
    connect: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_backoff(service_name, address, connection_backoff(), connect).await
}

/// Retry `connect` on the delays of `backoff`, returning the last error once
/// they run out.
pub async fn retry_with_backoff<T, E, F, Fut>(
    service_name: &str,
    address: &str,
    backoff: ExponentialBuilder,
    connect: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let result = connect
        .retry(backoff)
        .notify(|err: &E, delay: Duration| {
            warn!(service = %service_name, error = %err, delay = ?delay, "Connection failed, retrying");
        })
        .await;

    match &result {
        Ok(_) => info!("Connected to {} at {}", service_name, address),
        Err(e) => error!("Failed to connect to {} at {}: {}", service_name, address, e),
    }
    result
}
