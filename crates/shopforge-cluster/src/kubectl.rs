//! kubectl CLI client.

use async_trait::async_trait;
use serde::Deserialize;
use shopforge_core::config::ClusterConfig;
use shopforge_core::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::command::{self, CommandOutput};
use crate::{ClusterEvent, ClusterInspector, PodStatus};

const KUBECTL_BIN: &str = "kubectl";

/// Shells out to the kubectl binary
pub struct KubectlClient {
    kubeconfig: Option<PathBuf>,
    timeout: Duration,
}

impl KubectlClient {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            kubeconfig: config.kubeconfig.clone(),
            timeout: config.kubectl_timeout(),
        }
    }

    async fn run(&self, mut args: Vec<String>) -> Result<CommandOutput> {
        if let Some(path) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(path.to_string_lossy().into_owned());
        }
        command::run(KUBECTL_BIN, &args, self.timeout).await
    }

    async fn run_checked(&self, args: Vec<String>) -> Result<CommandOutput> {
        let output = self.run(args).await?;
        if !output.success {
            return Err(Error::cluster(output.failure_message()));
        }
        Ok(output)
    }
}

#[async_trait]
impl ClusterInspector for KubectlClient {
    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        let output = self
            .run(vec![
                "get".to_string(),
                "namespace".to_string(),
                namespace.to_string(),
            ])
            .await?;
        Ok(output.success)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        // Cascade delete catches anything the chart did not own
        self.run_checked(vec![
            "delete".to_string(),
            "namespace".to_string(),
            namespace.to_string(),
            "--wait=true".to_string(),
            "--ignore-not-found".to_string(),
        ])
        .await?;
        tracing::info!(namespace = %namespace, "Namespace deleted");
        Ok(())
    }

    async fn pod_statuses(&self, namespace: &str) -> Result<Vec<PodStatus>> {
        let output = self
            .run_checked(vec![
                "get".to_string(),
                "pods".to_string(),
                "--namespace".to_string(),
                namespace.to_string(),
                "--output".to_string(),
                "json".to_string(),
            ])
            .await?;
        parse_pod_list(&output.stdout)
    }

    async fn all_pods_ready(&self, namespace: &str) -> Result<bool> {
        let pods = self.pod_statuses(namespace).await?;
        Ok(all_ready(&pods))
    }

    async fn job_completed(&self, namespace: &str, job: &str) -> Result<bool> {
        let output = self.get_job(namespace, job).await?;
        parse_job_condition(&output.stdout, "Complete")
    }

    async fn job_failed(&self, namespace: &str, job: &str) -> Result<bool> {
        let output = self.get_job(namespace, job).await?;
        parse_job_condition(&output.stdout, "Failed")
    }

    async fn events(&self, namespace: &str, limit: usize) -> Result<Vec<ClusterEvent>> {
        let output = self
            .run_checked(vec![
                "get".to_string(),
                "events".to_string(),
                "--namespace".to_string(),
                namespace.to_string(),
                "--sort-by=.lastTimestamp".to_string(),
                "--output".to_string(),
                "json".to_string(),
            ])
            .await?;

        let mut events = parse_events(&output.stdout)?;
        // Already sorted oldest first; keep the newest `limit`, newest last
        if events.len() > limit {
            events.drain(..events.len() - limit);
        }
        Ok(events)
    }
}

impl KubectlClient {
    async fn get_job(&self, namespace: &str, job: &str) -> Result<CommandOutput> {
        self.run_checked(vec![
            "get".to_string(),
            "job".to_string(),
            job.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ])
        .await
    }
}

/// Readiness rule: at least one non-finished pod exists and every
/// non-finished pod reports Ready=True.
pub fn all_ready(pods: &[PodStatus]) -> bool {
    let running: Vec<&PodStatus> = pods.iter().filter(|p| !p.is_finished()).collect();
    !running.is_empty() && running.iter().all(|p| p.ready)
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Deserialize)]
struct PodItem {
    metadata: ObjectMeta,
    #[serde(default)]
    status: RawPodStatus,
}

#[derive(Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawPodStatus {
    #[serde(default)]
    phase: String,
    #[serde(default)]
    conditions: Vec<RawCondition>,
    #[serde(default)]
    container_statuses: Vec<RawContainerStatus>,
}

#[derive(Deserialize)]
struct RawCondition {
    #[serde(rename = "type", default)]
    condition_type: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContainerStatus {
    #[serde(default)]
    restart_count: u32,
}

fn parse_pod_list(json: &str) -> Result<Vec<PodStatus>> {
    let list: PodList = serde_json::from_str(json)
        .map_err(|e| Error::cluster(format!("Unparseable pod list: {e}")))?;

    Ok(list
        .items
        .into_iter()
        .map(|item| {
            let ready = item
                .status
                .conditions
                .iter()
                .any(|c| c.condition_type == "Ready" && c.status == "True");
            let restarts = item
                .status
                .container_statuses
                .iter()
                .map(|c| c.restart_count)
                .sum();
            PodStatus {
                name: item.metadata.name,
                phase: item.status.phase,
                ready,
                restarts,
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventItem {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    involved_object: Option<InvolvedObject>,
    #[serde(default)]
    last_timestamp: Option<String>,
}

#[derive(Deserialize)]
struct InvolvedObject {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn parse_events(json: &str) -> Result<Vec<ClusterEvent>> {
    let list: EventList = serde_json::from_str(json)
        .map_err(|e| Error::cluster(format!("Unparseable event list: {e}")))?;

    Ok(list
        .items
        .into_iter()
        .map(|item| {
            let object = match &item.involved_object {
                Some(obj) => format!(
                    "{}/{}",
                    obj.kind.as_deref().unwrap_or("Unknown"),
                    obj.name.as_deref().unwrap_or("unknown")
                ),
                None => "Unknown/unknown".to_string(),
            };
            ClusterEvent {
                event_type: item.event_type,
                reason: item.reason,
                message: item.message,
                object,
                timestamp: item.last_timestamp,
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct JobDocument {
    #[serde(default)]
    status: RawJobStatus,
}

#[derive(Deserialize, Default)]
struct RawJobStatus {
    #[serde(default)]
    conditions: Vec<RawCondition>,
}

fn parse_job_condition(json: &str, condition: &str) -> Result<bool> {
    let job: JobDocument = serde_json::from_str(json)
        .map_err(|e| Error::cluster(format!("Unparseable job status: {e}")))?;

    Ok(job
        .status
        .conditions
        .iter()
        .any(|c| c.condition_type == condition && c.status == "True"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD_LIST: &str = r#"{
        "items": [
            {
                "metadata": { "name": "wordpress-0" },
                "status": {
                    "phase": "Running",
                    "conditions": [
                        { "type": "Initialized", "status": "True" },
                        { "type": "Ready", "status": "True" }
                    ],
                    "containerStatuses": [
                        { "restartCount": 1 },
                        { "restartCount": 2 }
                    ]
                }
            },
            {
                "metadata": { "name": "wp-init-job-x1" },
                "status": { "phase": "Succeeded" }
            },
            {
                "metadata": { "name": "mysql-0" },
                "status": {
                    "phase": "Running",
                    "conditions": [ { "type": "Ready", "status": "False" } ],
                    "containerStatuses": [ { "restartCount": 6 } ]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_pod_list() {
        let pods = parse_pod_list(POD_LIST).unwrap();
        assert_eq!(pods.len(), 3);
        assert_eq!(pods[0].name, "wordpress-0");
        assert!(pods[0].ready);
        assert_eq!(pods[0].restarts, 3);
        assert!(pods[1].is_finished());
        assert!(!pods[2].ready);
        assert_eq!(pods[2].restarts, 6);
    }

    #[test]
    fn test_all_ready_excludes_succeeded_pods() {
        let pods = vec![
            PodStatus {
                name: "init".into(),
                phase: "Succeeded".into(),
                ready: false,
                restarts: 0,
            },
            PodStatus {
                name: "web".into(),
                phase: "Running".into(),
                ready: true,
                restarts: 0,
            },
        ];
        assert!(all_ready(&pods));
    }

    #[test]
    fn test_all_ready_requires_one_long_running_pod() {
        let pods = vec![PodStatus {
            name: "init".into(),
            phase: "Succeeded".into(),
            ready: false,
            restarts: 0,
        }];
        assert!(!all_ready(&pods));
        assert!(!all_ready(&[]));
    }

    #[test]
    fn test_all_ready_fails_on_unready_pod() {
        let pods = vec![
            PodStatus {
                name: "web".into(),
                phase: "Running".into(),
                ready: true,
                restarts: 0,
            },
            PodStatus {
                name: "db".into(),
                phase: "Pending".into(),
                ready: false,
                restarts: 0,
            },
        ];
        assert!(!all_ready(&pods));
    }

    #[test]
    fn test_parse_events_builds_object_reference() {
        let json = r#"{
            "items": [
                {
                    "type": "Warning",
                    "reason": "BackOff",
                    "message": "Back-off restarting failed container",
                    "involvedObject": { "kind": "Pod", "name": "mysql-0" },
                    "lastTimestamp": "2026-07-30T10:00:00Z"
                }
            ]
        }"#;
        let events = parse_events(json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, "BackOff");
        assert_eq!(events[0].object, "Pod/mysql-0");
    }

    #[test]
    fn test_parse_job_conditions() {
        let json = r#"{
            "status": {
                "conditions": [
                    { "type": "Complete", "status": "True" }
                ]
            }
        }"#;
        assert!(parse_job_condition(json, "Complete").unwrap());
        assert!(!parse_job_condition(json, "Failed").unwrap());
    }

    #[test]
    fn test_parse_empty_pod_list() {
        assert!(parse_pod_list("{}").unwrap().is_empty());
    }
}
