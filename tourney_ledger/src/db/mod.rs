//! Database module providing PostgreSQL connection pooling and the ledger stores.
//!
//! This module manages the database connection pool using sqlx and defines the
//! transactional store interface the settlement workflows run against.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod errors;
pub mod memory;
pub mod repository;
pub mod schema;

pub use config::DatabaseConfig;
pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryTx};
pub use repository::{LedgerStore, LedgerTx, PgStore, PgTx, run_in_transaction};
pub use schema::{create_schema, recreate_schema};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    lock_timeout: Duration,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Database instance or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tourney_ledger::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::development();
    ///     let db = Database::new(&config).await?;
    ///     db.health_check().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            lock_timeout: config.lock_timeout(),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a ledger store over this pool with the configured lock wait limit
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone()).with_lock_timeout(self.lock_timeout)
    }

    /// Create any missing ledger tables
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        create_schema(&self.pool).await
    }

    /// Check if the database connection is healthy
    ///
    /// # Returns
    ///
    /// * `Result<(), sqlx::Error>` - Ok if healthy, error otherwise
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
