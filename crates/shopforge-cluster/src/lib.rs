//! # ShopForge Cluster
//!
//! Narrow interfaces over the chart tool (helm) and the cluster CLI
//! (kubectl), plus the subprocess plumbing both share. The provisioner
//! consumes these through the [`ChartDeployer`] and [`ClusterInspector`]
//! traits so workflows can be exercised against mockall doubles.

pub mod command;
pub mod helm;
pub mod kubectl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopforge_core::error::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use helm::HelmClient;
pub use kubectl::{all_ready, KubectlClient};

/// Everything helm needs to install one release
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub release: String,
    pub chart_path: PathBuf,
    pub namespace: String,
    pub create_namespace: bool,
    pub values: BTreeMap<String, String>,
}

/// Outcome of a chart install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The release was already present; installation skipped
    AlreadyExists,
    Installed { output: String },
}

/// Outcome of a chart uninstall
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// The release was already gone
    AlreadyRemoved,
    Uninstalled,
}

/// Snapshot of one pod's readiness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStatus {
    pub name: String,
    /// Kubernetes phase (Pending, Running, Succeeded, Failed, Unknown)
    pub phase: String,
    /// Condition Ready=True
    pub ready: bool,
    /// Total container restarts
    pub restarts: u32,
}

impl PodStatus {
    /// One-shot init work is excluded from the readiness check
    pub fn is_finished(&self) -> bool {
        self.phase == "Succeeded"
    }
}

/// One namespace event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub object: String,
    pub timestamp: Option<String>,
}

/// Install/uninstall operations against a namespaced release
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ChartDeployer: Send + Sync {
    /// Install a release; idempotent on the release name
    async fn install(&self, request: InstallRequest) -> Result<InstallOutcome>;

    /// Remove a release, waiting for its resources; idempotent
    async fn uninstall(&self, release: &str, namespace: &str) -> Result<UninstallOutcome>;

    async fn release_exists(&self, release: &str, namespace: &str) -> Result<bool>;
}

/// Read-side queries and cascade deletion against the live cluster
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ClusterInspector: Send + Sync {
    async fn namespace_exists(&self, namespace: &str) -> Result<bool>;

    /// Delete a namespace and wait for it to go away; no-op when absent
    async fn delete_namespace(&self, namespace: &str) -> Result<()>;

    async fn pod_statuses(&self, namespace: &str) -> Result<Vec<PodStatus>>;

    /// True when at least one non-finished pod exists and every
    /// non-finished pod has the Ready=True condition
    async fn all_pods_ready(&self, namespace: &str) -> Result<bool>;

    async fn job_completed(&self, namespace: &str, job: &str) -> Result<bool>;

    async fn job_failed(&self, namespace: &str, job: &str) -> Result<bool>;

    /// Recent namespace events, newest last
    async fn events(&self, namespace: &str, limit: usize) -> Result<Vec<ClusterEvent>>;
}
