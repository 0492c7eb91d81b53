//! Provision and delete workflows.
//!
//! Both workflows run fire-and-forget from request handlers; completion is
//! recorded on the store record, never returned to the API caller. The
//! operation lock is claimed on entry and released on every exit path.

use shopforge_cluster::{
    all_ready, ChartDeployer, ClusterInspector, InstallOutcome, InstallRequest, UninstallOutcome,
};
use shopforge_core::config::ProvisionerConfig;
use shopforge_core::error::{Error, Result};
use shopforge_engines::EngineRegistry;
use shopforge_registry::{StoreRegistry, StoreStatus};
use std::sync::Arc;
use std::time::Duration;

use crate::lock::{OperationKind, OperationLock};

/// Restart count beyond which a pod is treated as crash-looping
const MAX_POD_RESTARTS: u32 = 5;
/// Events included in a fail-fast message
const EVENT_SUMMARY_LIMIT: usize = 5;
const TIMEOUT_MESSAGE: &str = "Provisioning timed out";
const DELETE_CLAIM_RETRY: Duration = Duration::from_millis(250);

/// Orchestrates store lifecycle workflows against the cluster
pub struct Provisioner {
    registry: StoreRegistry,
    engines: Arc<EngineRegistry>,
    deployer: Arc<dyn ChartDeployer>,
    inspector: Arc<dyn ClusterInspector>,
    lock: Arc<OperationLock>,
    config: ProvisionerConfig,
}

impl Provisioner {
    pub fn new(
        registry: StoreRegistry,
        engines: Arc<EngineRegistry>,
        deployer: Arc<dyn ChartDeployer>,
        inspector: Arc<dyn ClusterInspector>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            registry,
            engines,
            deployer,
            inspector,
            lock: Arc::new(OperationLock::new()),
            config,
        }
    }

    /// The operation currently running for a store, if any
    pub fn operation(&self, store_id: &str) -> Option<OperationKind> {
        self.lock.current(store_id)
    }

    pub fn lock(&self) -> &OperationLock {
        &self.lock
    }

    /// Drive a store from `queued` (or `failed`, on retry) to `ready`.
    ///
    /// Idempotent on the operation lock: when an operation is already
    /// active for the store the call returns quietly. The whole workflow
    /// runs under the configured deadline; on expiry the store is forced
    /// to `failed`.
    pub async fn provision(&self, store_id: &str) -> Result<()> {
        if !self.lock.try_claim(store_id, OperationKind::Provisioning) {
            tracing::info!(store_id = %store_id, "Operation already active, skipping provision");
            return Ok(());
        }

        let result = match tokio::time::timeout(
            self.config.timeout(),
            self.run_provision(store_id),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.mark_failed(store_id, &e.to_string()).await;
                Err(e)
            }
            Err(_) => {
                tracing::warn!(store_id = %store_id, "Provision deadline elapsed");
                self.mark_failed(store_id, TIMEOUT_MESSAGE).await;
                Err(Error::ProvisioningTimeout)
            }
        };

        self.lock.release(store_id);
        result
    }

    async fn run_provision(&self, store_id: &str) -> Result<()> {
        let store = self.registry.require(store_id).await?;
        let engine = self.engines.resolve_tag(&store.engine)?;

        let validation = engine.validate();
        if !validation.valid {
            return Err(Error::EngineUnavailable {
                engine: store.engine.clone(),
                message: validation
                    .error
                    .unwrap_or_else(|| "engine reported itself unavailable".to_string()),
            });
        }

        self.registry
            .update_status(store_id, StoreStatus::Provisioning, None)
            .await?;

        let outcome = self
            .deployer
            .install(InstallRequest {
                release: store.helm_release.clone(),
                chart_path: engine.chart_path().to_path_buf(),
                namespace: store.namespace.clone(),
                create_namespace: true,
                values: engine.values(store_id),
            })
            .await?;
        if outcome == InstallOutcome::AlreadyExists {
            tracing::info!(store_id = %store_id, "Release present from a previous attempt");
        }

        self.wait_for_ready(&store.namespace).await?;

        let urls = engine.urls(store_id);
        self.registry
            .mark_ready(store_id, &urls.store_url, &urls.admin_url)
            .await?;
        Ok(())
    }

    /// Poll the namespace until every long-running pod is ready.
    ///
    /// Fails fast when a pod reaches phase `Failed` or crosses the restart
    /// threshold, enriching the error with the last namespace events.
    async fn wait_for_ready(&self, namespace: &str) -> Result<()> {
        let max_attempts = self.config.poll_max_attempts;

        for attempt in 1..=max_attempts {
            let pods = self.inspector.pod_statuses(namespace).await?;

            let failing: Vec<&str> = pods
                .iter()
                .filter(|p| p.phase == "Failed" || p.restarts > MAX_POD_RESTARTS)
                .map(|p| p.name.as_str())
                .collect();
            if !failing.is_empty() {
                let events = self
                    .inspector
                    .events(namespace, EVENT_SUMMARY_LIMIT)
                    .await
                    .unwrap_or_default();
                let summary = events
                    .iter()
                    .map(|e| format!("{}: {}", e.reason, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(Error::provisioning_failed(format!(
                    "Pods failed: {}. Events: {}",
                    failing.join(", "),
                    summary
                )));
            }

            if all_ready(&pods) {
                tracing::info!(namespace = %namespace, attempt, "All pods ready");
                return Ok(());
            }

            tracing::debug!(namespace = %namespace, attempt, "Pods not ready yet");
            if attempt < max_attempts {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }

        let waited_secs = (self.config.poll_interval().as_millis() as u64)
            .saturating_mul(u64::from(max_attempts))
            / 1000;
        Err(Error::provisioning_failed(format!(
            "Pods not ready after {max_attempts} checks ({waited_secs}s)"
        )))
    }

    /// Tear a store down: uninstall the release, cascade-delete the
    /// namespace, and mark the record `deleted`.
    ///
    /// An uninstall failure is only a warning; the namespace delete is the
    /// backstop that guarantees cleanup.
    pub async fn delete(&self, store_id: &str) -> Result<()> {
        self.claim_for_delete(store_id).await?;

        let result = self.run_delete(store_id).await;
        if let Err(e) = &result {
            self.mark_failed(store_id, &format!("Delete failed: {e}")).await;
        }

        self.lock.release(store_id);
        result
    }

    /// A concurrent delete is an error; a running provision is waited out
    /// and then taken over.
    async fn claim_for_delete(&self, store_id: &str) -> Result<()> {
        loop {
            if self.lock.try_claim(store_id, OperationKind::Deleting) {
                return Ok(());
            }
            match self.lock.current(store_id) {
                Some(OperationKind::Deleting) => {
                    return Err(Error::operation_in_progress(store_id, "deleting"));
                }
                _ => {
                    tracing::debug!(store_id = %store_id, "Waiting for active operation to release");
                    tokio::time::sleep(DELETE_CLAIM_RETRY).await;
                }
            }
        }
    }

    async fn run_delete(&self, store_id: &str) -> Result<()> {
        let store = self.registry.require(store_id).await?;
        self.registry
            .update_status(store_id, StoreStatus::Deleting, None)
            .await?;

        match self
            .deployer
            .uninstall(&store.helm_release, &store.namespace)
            .await
        {
            Ok(UninstallOutcome::AlreadyRemoved) => {
                tracing::info!(store_id = %store_id, "Release was already removed");
            }
            Ok(UninstallOutcome::Uninstalled) => {}
            Err(e) => {
                tracing::warn!(
                    store_id = %store_id,
                    error = %e,
                    "Helm uninstall failed; relying on namespace delete"
                );
            }
        }

        self.inspector.delete_namespace(&store.namespace).await?;
        self.registry.mark_deleted(store_id).await?;
        Ok(())
    }

    /// Best-effort transition to `failed`; a store must never be left
    /// mid-flight without an error message.
    async fn mark_failed(&self, store_id: &str, message: &str) {
        if let Err(e) = self
            .registry
            .update_status(store_id, StoreStatus::Failed, Some(message))
            .await
        {
            tracing::error!(store_id = %store_id, error = %e, "Failed to record failure");
        }
    }
}
