//! Startup reconciliation.
//!
//! A previous process may have died mid-flight, leaving stores in `queued`
//! or `provisioning`. The reconciler converges each such record with what
//! the cluster actually says, and never resumes provisioning on its own;
//! the operator retries deliberately.

use serde_json::json;
use shopforge_cluster::ClusterInspector;
use shopforge_core::error::Result;
use shopforge_engines::EngineRegistry;
use shopforge_registry::{AuditAction, StoreRegistry, StoreStatus};
use std::sync::Arc;

const RESTART_MESSAGE: &str = "API restarted during provisioning. Click retry to re-attempt.";

/// Outcome counts of one reconciliation pass
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub marked_ready: usize,
    pub marked_failed: usize,
}

/// Converges persisted lifecycle state with cluster reality at startup
pub struct Reconciler {
    registry: StoreRegistry,
    engines: Arc<EngineRegistry>,
    inspector: Arc<dyn ClusterInspector>,
}

impl Reconciler {
    pub fn new(
        registry: StoreRegistry,
        engines: Arc<EngineRegistry>,
        inspector: Arc<dyn ClusterInspector>,
    ) -> Self {
        Self {
            registry,
            engines,
            inspector,
        }
    }

    /// Run one pass over all stores left mid-flight. Per-store failures
    /// are recorded on the store and do not stop the pass.
    pub async fn run(&self) -> Result<ReconcileSummary> {
        let stores = self.registry.list().await?;
        let mut summary = ReconcileSummary::default();

        for store in stores {
            if !matches!(
                store.status,
                StoreStatus::Provisioning | StoreStatus::Queued
            ) {
                continue;
            }
            summary.checked += 1;

            tracing::info!(store_id = %store.id, status = %store.status, "Reconciling mid-flight store");
            match self.inspector.all_pods_ready(&store.namespace).await {
                Ok(true) => {
                    if let Err(e) = self.mark_recovered(&store.id, &store.engine).await {
                        tracing::error!(store_id = %store.id, error = %e, "Recovery update failed");
                        continue;
                    }
                    summary.marked_ready += 1;
                }
                Ok(false) => {
                    if let Err(e) = self
                        .registry
                        .update_status(&store.id, StoreStatus::Failed, Some(RESTART_MESSAGE))
                        .await
                    {
                        tracing::error!(store_id = %store.id, error = %e, "Recovery update failed");
                        continue;
                    }
                    self.audit_recovery(&store.id, "marked_failed").await;
                    summary.marked_failed += 1;
                }
                Err(e) => {
                    let message = format!("Recovery failed: {e}");
                    tracing::warn!(store_id = %store.id, error = %e, "Cluster query failed during recovery");
                    if let Err(e) = self
                        .registry
                        .update_status(&store.id, StoreStatus::Failed, Some(&message))
                        .await
                    {
                        tracing::error!(store_id = %store.id, error = %e, "Recovery update failed");
                        continue;
                    }
                    summary.marked_failed += 1;
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            marked_ready = summary.marked_ready,
            marked_failed = summary.marked_failed,
            "Reconciliation complete"
        );
        Ok(summary)
    }

    async fn mark_recovered(&self, store_id: &str, engine_tag: &str) -> Result<()> {
        let engine = self.engines.resolve_tag(engine_tag)?;
        let urls = engine.urls(store_id);
        self.registry
            .mark_ready(store_id, &urls.store_url, &urls.admin_url)
            .await?;
        self.audit_recovery(store_id, "marked_ready").await;
        Ok(())
    }

    async fn audit_recovery(&self, store_id: &str, result: &str) {
        self.registry
            .audit()
            .append_best_effort(
                Some(store_id),
                AuditAction::Recovery,
                json!({ "result": result }),
            )
            .await;
    }
}
