//! Database management.
//!
//! Owns the SQLite connection pool and runs the embedded migrations. Create
//! one at startup and hand `pool()` clones to the stores.

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub use sqlx::{SqlitePool as DbPool, sqlite::SqliteRow as DbRow};

/// Shared database for the service.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect (creating the SQLite file if needed) and run migrations.
    pub async fn new(config: &DatabaseConfig, data_dir: &Path) -> Result<Self> {
        let db_path = config
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("hillz.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        info!(backend = "sqlite", path = %db_path.display(), "Database connected");

        Ok(Self { pool })
    }

    /// Get a clone of the connection pool (internally Arc-based).
    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_connection() {
        let temp = TempDir::new().unwrap();
        let config = DatabaseConfig::default();
        let db = Database::new(&config, temp.path()).await.unwrap();

        let _pool = db.pool();
        assert!(temp.path().join("hillz.db").exists());
    }

    #[tokio::test]
    async fn test_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("events.db");
        let config = DatabaseConfig {
            path: Some(path.clone()),
        };
        Database::new(&config, temp.path()).await.unwrap();
        assert!(path.exists());
    }
}
