//! Database entities for stores and audit entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StoreStatus {
    Queued,
    Provisioning,
    Ready,
    Failed,
    Deleting,
    Deleted,
}

impl StoreStatus {
    /// States that count toward the platform quota
    pub fn is_active(&self) -> bool {
        !matches!(self, StoreStatus::Deleted | StoreStatus::Failed)
    }

    /// No mutation is valid once a store reaches this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StoreStatus::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Queued => "queued",
            StoreStatus::Provisioning => "provisioning",
            StoreStatus::Ready => "ready",
            StoreStatus::Failed => "failed",
            StoreStatus::Deleting => "deleting",
            StoreStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned tenant stack owned by one namespace
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Store {
    /// Unique id, also used as namespace and helm release name
    pub id: String,
    /// Operator-provided display name
    pub name: String,
    /// Engine tag (woocommerce, medusa)
    pub engine: String,
    /// Lifecycle state
    pub status: StoreStatus,
    pub store_url: Option<String>,
    pub admin_url: Option<String>,
    pub error_message: Option<String>,
    pub namespace: String,
    pub helm_release: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a store at status `queued`
#[derive(Debug, Clone)]
pub struct NewStore {
    pub id: String,
    pub name: String,
    pub engine: String,
}

/// Generate a store id: `store-` plus the first group of a v4 UUID.
/// The id doubles as namespace and release name, so it must be a valid
/// DNS label.
pub fn generate_store_id() -> String {
    let uuid = Uuid::new_v4().to_string();
    let head = uuid.split('-').next().unwrap_or("00000000");
    format!("store-{head}")
}

/// Audit log action tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Delete,
    StatusChange,
    Retry,
    Recovery,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "create",
            AuditAction::Delete => "delete",
            AuditAction::StatusChange => "status_change",
            AuditAction::Retry => "retry",
            AuditAction::Recovery => "recovery",
        };
        f.write_str(s)
    }
}

/// One append-only lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub store_id: Option<String>,
    pub action: AuditAction,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Aggregate timings over stores that reached `ready`
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningStats {
    pub total_provisioned: u64,
    pub avg_duration_seconds: Option<f64>,
    pub min_duration_seconds: Option<f64>,
    pub max_duration_seconds: Option<f64>,
}
