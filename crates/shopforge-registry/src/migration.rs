//! Embedded schema migrations.

use shopforge_core::error::{Error, Result};
use sqlx::SqlitePool;

/// Migration entry
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Database migrator
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    /// The full embedded migration set
    pub fn with_default_migrations() -> Self {
        Self {
            migrations: vec![
                Migration {
                    version: 1,
                    name: "create_stores",
                    sql: r#"
                        CREATE TABLE stores (
                            id            TEXT PRIMARY KEY,
                            name          TEXT NOT NULL,
                            engine        TEXT NOT NULL,
                            status        TEXT NOT NULL,
                            store_url     TEXT,
                            admin_url     TEXT,
                            error_message TEXT,
                            namespace     TEXT NOT NULL,
                            helm_release  TEXT NOT NULL,
                            created_at    TEXT NOT NULL,
                            updated_at    TEXT NOT NULL
                        );
                        CREATE INDEX idx_stores_status ON stores(status);
                    "#,
                },
                Migration {
                    version: 2,
                    name: "create_audit_log",
                    sql: r#"
                        CREATE TABLE audit_log (
                            id         INTEGER PRIMARY KEY AUTOINCREMENT,
                            store_id   TEXT,
                            action     TEXT NOT NULL,
                            details    TEXT NOT NULL,
                            created_at TEXT NOT NULL
                        );
                        CREATE INDEX idx_audit_log_store_id ON audit_log(store_id);
                        CREATE INDEX idx_audit_log_created_at ON audit_log(created_at);
                    "#,
                },
            ],
        }
    }

    /// Run all pending migrations
    pub async fn run(&self, pool: &SqlitePool) -> Result<Vec<i64>> {
        self.ensure_migrations_table(pool).await?;
        let applied = self.applied_versions(pool).await?;

        let mut newly_applied = Vec::new();
        for migration in &self.migrations {
            if !applied.contains(&migration.version) {
                self.apply(pool, migration).await?;
                newly_applied.push(migration.version);
            }
        }

        if newly_applied.is_empty() {
            tracing::debug!("No pending migrations");
        } else {
            tracing::info!(count = newly_applied.len(), "Applied migrations");
        }

        Ok(newly_applied)
    }

    async fn ensure_migrations_table(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version    INTEGER PRIMARY KEY,
                name       TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to create migrations table", e))?;
        Ok(())
    }

    async fn applied_versions(&self, pool: &SqlitePool) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT version FROM schema_migrations ORDER BY version")
                .fetch_all(pool)
                .await
                .map_err(|e| Error::database_with_source("Failed to read migrations", e))?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    async fn apply(&self, pool: &SqlitePool, migration: &Migration) -> Result<()> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| Error::database_with_source("Failed to begin migration", e))?;

        // SQLite rejects multiple statements in one prepared query
        for statement in migration
            .sql
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                Error::database_with_source(
                    format!("Migration {} ({}) failed", migration.version, migration.name),
                    e,
                )
            })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::database_with_source("Failed to record migration", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::database_with_source("Failed to commit migration", e))?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
        Ok(())
    }
}
