pub mod config;
pub mod memory;
pub mod migrate;
pub mod operations;

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};
use crate::db::migrate::MigrationError;
use crate::db::operations::{PgItemCatalog, PgProgressStore};

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the PostgreSQL pool and hands out the store adapters built on it.
#[derive(Clone)]
pub struct DatabaseProxy {
    pool: PgPool,
}

impl DatabaseProxy {
    pub async fn connect(config: DbConfig) -> Result<Arc<Self>, DbInitError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        if config.run_migrations {
            migrate::run_migrations(&pool).await?;
        }

        tracing::info!(
            max_connections = config.max_connections,
            "database pool initialized"
        );

        Ok(Arc::new(Self { pool }))
    }

    pub fn progress_store(&self) -> PgProgressStore {
        PgProgressStore::new(self.pool.clone())
    }

    pub fn catalog(&self) -> PgItemCatalog {
        PgItemCatalog::new(self.pool.clone())
    }

    /// `SELECT 1` bounded by a short timeout.
    pub async fn ping(&self) -> bool {
        let result =
            tokio::time::timeout(PING_TIMEOUT, sqlx::query("SELECT 1").execute(&self.pool)).await;
        match result {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "database ping failed");
                false
            }
            Err(_) => {
                tracing::warn!("database ping timed out");
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
