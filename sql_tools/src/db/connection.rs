//! Database connection handling
//!
//! This module establishes the PostgreSQL pool used for introspection.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// A pooled PostgreSQL connection bound to one schema
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
    schema: String,
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if !config.url.starts_with("postgres://") && !config.url.starts_with("postgresql://") {
            return Err(Error::DatabaseError(format!(
                "Unsupported database url: {}",
                config.url
            )));
        }

        let pool_size = config.pool_size.unwrap_or(10);
        let timeout_seconds = config.timeout_seconds.unwrap_or(30);

        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(timeout_seconds))
            .connect(&config.url)
            .await?;

        tracing::debug!(pool_size, "Connected to database");

        Ok(Self::from_pool(
            pool,
            config.schema.as_deref().unwrap_or("public"),
        ))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            schema: schema.to_string(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the schema name this connection introspects
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Execute a SQL statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }
}
