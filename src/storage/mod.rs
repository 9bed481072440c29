//! Storage implementations.
//!
//! Each backend provides a [`StatsStore`] (checkpoints, locks and fact
//! tables, all inside batch transactions) and an [`OrderSource`] reading the
//! orders table of the same database.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::{OrderSource, Result, StatsError, StatsStore};

pub mod locks;
pub mod mock;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod schema;
#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod sql;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use locks::{LocalLockGuard, LocalLockRegistry};
pub use mock::{MockOrderSource, MockStatsStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresOrderSource, PostgresStatsStore, PostgresStatsTransaction};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteOrderSource, SqliteStatsStore, SqliteStatsTransaction};

/// Connected storage backend.
#[derive(Clone)]
pub struct Storage {
    pub stats: Arc<dyn StatsStore>,
    pub orders: Arc<dyn OrderSource>,
}

/// Initialize storage based on configuration.
///
/// Connects with retry, applies the embedded migrations when
/// `run_migrations` is set, and returns the backend's stores.
pub async fn init_storage(config: &StorageConfig) -> Result<Storage> {
    info!(storage_type = %config.storage_type, "Initializing storage");

    match config.storage_type {
        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            use sqlx::postgres::PgPoolOptions;

            let uri = &config.postgres.uri;
            let pool = crate::utils::bootstrap::connect_with_retry("postgres", uri, || {
                PgPoolOptions::new()
                    .max_connections(config.postgres.max_connections)
                    .connect(uri)
            })
            .await?;

            if config.run_migrations {
                sqlx::migrate!("migrations/postgres").run(&pool).await?;
                info!("PostgreSQL migrations applied");
            }

            Ok(Storage {
                stats: Arc::new(PostgresStatsStore::new(pool.clone())),
                orders: Arc::new(PostgresOrderSource::new(pool)),
            })
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            use std::str::FromStr;

            use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

            let path = &config.sqlite.path;
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StatsError::Backend(format!("cannot create {:?}: {}", parent, e)))?;
            }

            let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = crate::utils::bootstrap::connect_with_retry("sqlite", path, || {
                SqlitePoolOptions::new()
                    .max_connections(config.sqlite.max_connections.max(1))
                    .connect_with(options.clone())
            })
            .await?;

            if config.run_migrations {
                sqlx::migrate!("migrations/sqlite").run(&pool).await?;
                info!("SQLite migrations applied");
            }

            Ok(Storage {
                stats: Arc::new(SqliteStatsStore::new(pool.clone())),
                orders: Arc::new(SqliteOrderSource::new(pool)),
            })
        }
        #[allow(unreachable_patterns)]
        other => Err(StatsError::UnknownStorage(format!(
            "{} (feature not enabled)",
            other
        ))),
    }
}
