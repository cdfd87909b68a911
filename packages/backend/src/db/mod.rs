pub mod config;
pub mod migrate;
pub mod operations;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};

/// PostgreSQL-backed content store.
#[derive(Clone)]
pub struct PgStore {
    config: DbConfig,
    pool: PgPool,
}

impl PgStore {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;
        Self::connect(config).await
    }

    pub async fn connect(config: DbConfig) -> Result<Arc<Self>, DbInitError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(DbInitError::Sqlx)?;

        if config.run_migrations {
            migrate::run_migrations(&pool).await?;
        } else {
            tracing::info!("RUN_MIGRATIONS disabled, skipping schema migrations");
        }

        Ok(Arc::new(Self { config, pool }))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Migration(#[from] migrate::MigrationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
