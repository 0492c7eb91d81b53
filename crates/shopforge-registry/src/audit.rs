//! Append-only audit log of lifecycle events.
//!
//! Entries are never updated or removed. Appending is best-effort from the
//! registry's point of view: a failed append is logged and does not roll
//! back the mutation that triggered it.

use chrono::Utc;
use shopforge_core::error::{Error, Result};
use sqlx::SqlitePool;

use crate::models::{AuditAction, AuditEntry};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 500;

/// Handle to the audit_log table
#[derive(Clone)]
pub struct AuditLog {
    pool: SqlitePool,
}

impl AuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one entry
    pub async fn append(
        &self,
        store_id: Option<&str>,
        action: AuditAction,
        details: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (store_id, action, details, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(store_id)
        .bind(action)
        .bind(details)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to append audit entry", e))?;
        Ok(())
    }

    /// Append without propagating failure. Used on the mutation path where
    /// the audit write must not roll back the store update.
    pub async fn append_best_effort(
        &self,
        store_id: Option<&str>,
        action: AuditAction,
        details: serde_json::Value,
    ) {
        if let Err(e) = self.append(store_id, action, details).await {
            tracing::warn!(
                store_id = store_id.unwrap_or("-"),
                action = %action,
                error = %e,
                "Failed to append audit entry"
            );
        }
    }

    /// Newest entries first. `limit` is clamped to [1, 500], default 100.
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<AuditEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        sqlx::query_as::<_, AuditEntry>(
            "SELECT id, store_id, action, details, created_at
             FROM audit_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to list audit entries", e))
    }

    /// All entries for one store, newest first
    pub async fn list_for(&self, store_id: &str) -> Result<Vec<AuditEntry>> {
        sqlx::query_as::<_, AuditEntry>(
            "SELECT id, store_id, action, details, created_at
             FROM audit_log WHERE store_id = ? ORDER BY id DESC",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to list audit entries", e))
    }
}
