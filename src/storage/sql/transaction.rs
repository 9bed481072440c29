//! Unified SQL checkpoint and fact writes.
//!
//! Both backends wrap an open `sqlx::Transaction` in a field named `tx`;
//! the macro below implements `CheckpointStore` and `FactRepository` on
//! top of it. Advisory locking differs per backend and lives next to each
//! transaction type.

/// Macro to implement CheckpointStore and FactRepository for a backend's
/// transaction type.
macro_rules! impl_stats_transaction {
    ($tx_type:ty, $db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::CheckpointStore for $tx_type {
            async fn get(
                &mut self,
                key: crate::model::CheckpointKey,
            ) -> crate::interfaces::Result<Option<serde_json::Value>> {
                use sqlx::Row;

                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_select(statements::select_checkpoint(key));
                let row = sqlx::query(&sql).fetch_optional(&mut *self.tx).await?;

                match row {
                    Some(row) => {
                        let value: sqlx::types::Json<serde_json::Value> = row.try_get("value")?;
                        Ok(Some(value.0))
                    }
                    None => Ok(None),
                }
            }

            async fn set(
                &mut self,
                key: crate::model::CheckpointKey,
                value: &serde_json::Value,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_insert(statements::upsert_checkpoint(
                    key,
                    value,
                    chrono::Utc::now(),
                ));
                sqlx::query(&sql).execute(&mut *self.tx).await?;
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::FactRepository for $tx_type {
            async fn day_bucket(
                &mut self,
                at: chrono::DateTime<chrono::Utc>,
            ) -> crate::interfaces::Result<chrono::NaiveDate> {
                use sqlx::Row;

                use crate::storage::sql::SqlDatabase;

                let sql = <$db_type>::day_bucket_query(&crate::model::format_timestamp(&at));
                let row = sqlx::query(&sql).fetch_one(&mut *self.tx).await?;
                let bucket: String = row.try_get("bucket")?;

                chrono::NaiveDate::parse_from_str(&bucket, "%Y-%m-%d").map_err(|e| {
                    crate::interfaces::StatsError::Backend(format!(
                        "unexpected day bucket {:?}: {}",
                        bucket, e
                    ))
                })
            }

            async fn background_order_recorded(
                &mut self,
                background_id: i64,
                date: chrono::NaiveDate,
                order_id: i64,
            ) -> crate::interfaces::Result<bool> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_select(statements::select_background_order(
                    background_id,
                    date,
                    order_id,
                ));
                let row = sqlx::query(&sql).fetch_optional(&mut *self.tx).await?;
                Ok(row.is_some())
            }

            async fn add_background_usage(
                &mut self,
                background_id: i64,
                date: chrono::NaiveDate,
                usage: i64,
                conversions: i64,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_insert(statements::add_background_usage(
                    background_id,
                    date,
                    usage,
                    conversions,
                ));
                sqlx::query(&sql).execute(&mut *self.tx).await?;
                Ok(())
            }

            async fn record_background_order(
                &mut self,
                background_id: i64,
                date: chrono::NaiveDate,
                order_id: i64,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_insert(statements::insert_background_order(
                    background_id,
                    date,
                    order_id,
                ));
                sqlx::query(&sql).execute(&mut *self.tx).await?;
                Ok(())
            }

            async fn record_background_product(
                &mut self,
                background_id: i64,
                date: chrono::NaiveDate,
                product_id: i64,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                // Products missing from the catalog would violate the foreign key.
                let sql = <$db_type>::build_select(statements::select_product(product_id));
                if sqlx::query(&sql)
                    .fetch_optional(&mut *self.tx)
                    .await?
                    .is_none()
                {
                    tracing::debug!(product_id, "Skipping product missing from catalog");
                    return Ok(());
                }

                let sql = <$db_type>::build_insert(statements::insert_background_product(
                    background_id,
                    date,
                    product_id,
                ));
                sqlx::query(&sql).execute(&mut *self.tx).await?;
                Ok(())
            }

            async fn upsert_sales_fact(
                &mut self,
                fact: &crate::model::SalesFact,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_insert(statements::upsert_sales_fact(fact));
                sqlx::query(&sql).execute(&mut *self.tx).await?;
                Ok(())
            }

            async fn replace_sales_products(
                &mut self,
                date: chrono::NaiveDate,
                order_id: i64,
                products: &[crate::model::SalesProductFact],
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_delete(statements::delete_sales_products(date, order_id));
                sqlx::query(&sql).execute(&mut *self.tx).await?;

                let insert = statements::insert_sales_products(date, order_id, products)
                    .map(<$db_type>::build_insert);
                if let Some(sql) = insert {
                    sqlx::query(&sql).execute(&mut *self.tx).await?;
                }
                Ok(())
            }

            async fn record_dead_letter(
                &mut self,
                letter: &crate::model::DeadLetter,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::sql::{statements, SqlDatabase};

                let sql = <$db_type>::build_insert(statements::upsert_dead_letter(
                    letter,
                    chrono::Utc::now(),
                ));
                sqlx::query(&sql).execute(&mut *self.tx).await?;
                Ok(())
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_stats_transaction!(
    crate::storage::postgres::PostgresStatsTransaction,
    super::postgres::Postgres,
    "postgres"
);
impl_stats_transaction!(
    crate::storage::sqlite::SqliteStatsTransaction,
    super::sqlite::Sqlite,
    "sqlite"
);
