//! SQLite connection handling.

use shopforge_core::error::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::migration::Migrator;

/// Handle to the embedded database
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file, switch it to WAL journaling,
    /// and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::database_with_source("Failed to create database directory", e)
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::database_with_source("Failed to open database", e))?;

        let db = Self { pool };
        Migrator::with_default_migrations().run(db.pool()).await?;
        Ok(db)
    }

    /// Open an in-memory database, used by tests. A single connection keeps
    /// the database alive for the pool's lifetime.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::database_with_source("Invalid connection string", e))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::database_with_source("Failed to open in-memory database", e))?;

        let db = Self { pool };
        Migrator::with_default_migrations().run(db.pool()).await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Verify the database answers queries
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("Database health check failed", e))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
