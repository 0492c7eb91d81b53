//! Store registry: durable lifecycle state per store.
//!
//! Every mutation bumps `updated_at` and emits an audit entry before
//! returning, so audit order matches mutation order for a given store.

use chrono::Utc;
use serde_json::json;
use shopforge_core::error::{Error, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use crate::audit::AuditLog;
use crate::models::{AuditAction, NewStore, ProvisioningStats, Store, StoreStatus};

/// Handle to the stores table
#[derive(Clone)]
pub struct StoreRegistry {
    pool: SqlitePool,
    audit: AuditLog,
}

impl StoreRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditLog::new(pool.clone());
        Self { pool, audit }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Insert a store at status `queued`. Namespace and release name equal
    /// the id by construction.
    pub async fn create(&self, new: NewStore) -> Result<Store> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO stores
                (id, name, engine, status, namespace, helm_release, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(&new.engine)
        .bind(StoreStatus::Queued)
        .bind(&new.id)
        .bind(&new.id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to insert store", e))?;

        self.audit
            .append_best_effort(
                Some(&new.id),
                AuditAction::Create,
                json!({ "name": new.name, "engine": new.engine }),
            )
            .await;

        tracing::info!(store_id = %new.id, engine = %new.engine, "Store created");
        self.require(&new.id).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Store>> {
        sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("Failed to fetch store", e))
    }

    /// Like `get`, but a missing row is an error
    pub async fn require(&self, id: &str) -> Result<Store> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("Store", id))
    }

    /// All stores, newest first
    pub async fn list(&self) -> Result<Vec<Store>> {
        sqlx::query_as::<_, Store>("SELECT * FROM stores ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("Failed to list stores", e))
    }

    /// Number of stores counted against the quota (status not in
    /// {deleted, failed})
    pub async fn active_count(&self) -> Result<u32> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM stores WHERE status NOT IN ('deleted', 'failed')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to count active stores", e))?;
        Ok(count as u32)
    }

    /// Transition a store to `status`, replacing its error message
    pub async fn update_status(
        &self,
        id: &str,
        status: StoreStatus,
        error_message: Option<&str>,
    ) -> Result<Store> {
        let previous = self.require(id).await?;

        sqlx::query("UPDATE stores SET status = ?, error_message = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(error_message)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("Failed to update store status", e))?;

        self.audit
            .append_best_effort(
                Some(id),
                AuditAction::StatusChange,
                json!({
                    "from": previous.status,
                    "to": status,
                    "error_message": error_message,
                }),
            )
            .await;

        tracing::info!(store_id = %id, from = %previous.status, to = %status, "Status changed");
        self.require(id).await
    }

    /// Transition to `ready` with the engine-computed URLs, clearing any
    /// previous error
    pub async fn mark_ready(&self, id: &str, store_url: &str, admin_url: &str) -> Result<Store> {
        let previous = self.require(id).await?;

        sqlx::query(
            r#"
            UPDATE stores
            SET status = ?, store_url = ?, admin_url = ?, error_message = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(StoreStatus::Ready)
        .bind(store_url)
        .bind(admin_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to mark store ready", e))?;

        self.audit
            .append_best_effort(
                Some(id),
                AuditAction::StatusChange,
                json!({
                    "from": previous.status,
                    "to": StoreStatus::Ready,
                    "store_url": store_url,
                }),
            )
            .await;

        tracing::info!(store_id = %id, store_url = %store_url, "Store ready");
        self.require(id).await
    }

    /// Transition to the terminal `deleted` state
    pub async fn mark_deleted(&self, id: &str) -> Result<Store> {
        let previous = self.require(id).await?;

        sqlx::query("UPDATE stores SET status = ?, updated_at = ? WHERE id = ?")
            .bind(StoreStatus::Deleted)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source("Failed to mark store deleted", e))?;

        self.audit
            .append_best_effort(
                Some(id),
                AuditAction::Delete,
                json!({ "from": previous.status }),
            )
            .await;

        tracing::info!(store_id = %id, "Store deleted");
        self.require(id).await
    }

    /// Most recently failed stores, newest failure first
    pub async fn recent_failures(&self, limit: u32) -> Result<Vec<Store>> {
        sqlx::query_as::<_, Store>(
            "SELECT * FROM stores WHERE status = 'failed' ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database_with_source("Failed to list recent failures", e))
    }

    /// Count of stores per status
    pub async fn status_histogram(&self) -> Result<BTreeMap<String, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM stores GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::database_with_source("Failed to build status histogram", e))?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, count as u64))
            .collect())
    }

    /// Provisioning duration stats over stores currently `ready`, computed
    /// as `updated_at - created_at`
    pub async fn provisioning_stats(&self) -> Result<ProvisioningStats> {
        let rows: Vec<Store> =
            sqlx::query_as("SELECT * FROM stores WHERE status = 'ready'")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::database_with_source("Failed to fetch ready stores", e))?;

        let durations: Vec<f64> = rows
            .iter()
            .map(|s| (s.updated_at - s.created_at).num_milliseconds() as f64 / 1000.0)
            .collect();

        if durations.is_empty() {
            return Ok(ProvisioningStats {
                total_provisioned: 0,
                avg_duration_seconds: None,
                min_duration_seconds: None,
                max_duration_seconds: None,
            });
        }

        let total = durations.len() as u64;
        let sum: f64 = durations.iter().sum();
        let min = durations.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = durations.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Ok(ProvisioningStats {
            total_provisioned: total,
            avg_duration_seconds: Some(sum / total as f64),
            min_duration_seconds: Some(min),
            max_duration_seconds: Some(max),
        })
    }
}
