//! Database layer for Synthese
//!
//! Provides:
//! - SeaORM entity models
//! - One repository per entity behind a `Repository` facade
//! - Connection pool management
//! - Schema bootstrap from the entity definitions

pub mod models;
mod repository;
mod schema;

pub use repository::{
    ArticleRepository, KeywordAttachment, KeywordRepository, ReferenceRepository, Repository,
    UserRepository, PLACEHOLDER_SYNTHESIS, PLACEHOLDER_TITLE,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        let pool = Self { conn };

        if config.create_schema {
            pool.create_schema().await?;
        }

        info!("Database connection established");

        Ok(pool)
    }

    /// Private in-memory SQLite database with the schema already created
    ///
    /// The pool is pinned to a single connection: every SQLite memory
    /// connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let pool = Self { conn };
        pool.create_schema().await?;
        Ok(pool)
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Create any missing table
    pub async fn create_schema(&self) -> Result<()> {
        schema::create_tables(&self.conn).await
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
