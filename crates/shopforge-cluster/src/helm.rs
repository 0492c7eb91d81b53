//! Helm CLI client.

use async_trait::async_trait;
use shopforge_core::config::ClusterConfig;
use shopforge_core::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::command::{self, CommandOutput};
use crate::{ChartDeployer, InstallOutcome, InstallRequest, UninstallOutcome};

const HELM_BIN: &str = "helm";

/// Shells out to the helm binary
pub struct HelmClient {
    kubeconfig: Option<PathBuf>,
    timeout: Duration,
}

impl HelmClient {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            kubeconfig: config.kubeconfig.clone(),
            timeout: config.helm_timeout(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        match &self.kubeconfig {
            Some(path) => vec![
                "--kubeconfig".to_string(),
                path.to_string_lossy().into_owned(),
            ],
            None => Vec::new(),
        }
    }

    fn install_args(&self, request: &InstallRequest) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            request.release.clone(),
            request.chart_path.to_string_lossy().into_owned(),
            "--namespace".to_string(),
            request.namespace.clone(),
        ];
        if request.create_namespace {
            args.push("--create-namespace".to_string());
        }
        // Deliberately no --wait/--atomic: chart init jobs can take
        // minutes, and readiness is observed by the provisioner's poll.
        for (key, value) in &request.values {
            args.push("--set".to_string());
            args.push(format!("{key}={value}"));
        }
        args.extend(self.base_args());
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        command::run(HELM_BIN, &args, self.timeout).await
    }
}

#[async_trait]
impl ChartDeployer for HelmClient {
    async fn install(&self, request: InstallRequest) -> Result<InstallOutcome> {
        if self
            .release_exists(&request.release, &request.namespace)
            .await?
        {
            tracing::info!(release = %request.release, "Release already exists, skipping install");
            return Ok(InstallOutcome::AlreadyExists);
        }

        let output = self.run(self.install_args(&request)).await?;
        if !output.success {
            return Err(Error::helm(output.failure_message()));
        }

        tracing::info!(release = %request.release, namespace = %request.namespace, "Release installed");
        Ok(InstallOutcome::Installed {
            output: output.stdout,
        })
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<UninstallOutcome> {
        if !self.release_exists(release, namespace).await? {
            tracing::info!(release = %release, "Release already removed");
            return Ok(UninstallOutcome::AlreadyRemoved);
        }

        let mut args = vec![
            "uninstall".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "--wait".to_string(),
        ];
        args.extend(self.base_args());

        let output = self.run(args).await?;
        if !output.success {
            return Err(Error::helm(output.failure_message()));
        }

        tracing::info!(release = %release, namespace = %namespace, "Release uninstalled");
        Ok(UninstallOutcome::Uninstalled)
    }

    async fn release_exists(&self, release: &str, namespace: &str) -> Result<bool> {
        let mut args = vec![
            "status".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        args.extend(self.base_args());

        // `helm status` exits non-zero when the release is unknown
        let output = self.run(args).await?;
        Ok(output.success)
    }
}
