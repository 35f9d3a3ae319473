//! Container → Deployment/StatefulSet/DaemonSet/Job.
//!
//! Every workload family shares the same shape: the object's spec is
//! whatever the client last applied (the workload-last-applied label is
//! required — if it is missing the container was not created by this
//! adapter's workload path and there is nothing faithful to reconstruct),
//! overlaid with a status synthesized from the single backing container's
//! engine state.

use k2d_util::error::{Error, Result};
use k2d_util::naming;

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetStatus, Deployment, DeploymentCondition, DeploymentStatus, StatefulSet,
    StatefulSetStatus,
};
use k8s_openapi::api::batch::v1::{Job, JobStatus};

use super::model::EngineContainer;
use super::time::to_k8s_time;

fn last_applied(container: &EngineContainer) -> Result<&str> {
    container
        .label(naming::LABEL_LAST_APPLIED)
        .ok_or_else(|| Error::not_found("workload last-applied-configuration label"))
}

fn decode<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::Serialization("decoding workload last-applied".into(), e))
}

pub fn container_to_deployment(container: &EngineContainer) -> Result<Deployment> {
    let mut deployment: Deployment = decode(last_applied(container)?)?;
    let running = container.state.is_running();
    let (started_at, _) = container_start_finish(container);
    deployment.status = Some(DeploymentStatus {
        replicas: Some(1),
        ready_replicas: Some(if running { 1 } else { 0 }),
        available_replicas: Some(if running { 1 } else { 0 }),
        unavailable_replicas: Some(if running { 0 } else { 1 }),
        updated_replicas: Some(1),
        observed_generation: deployment.metadata.generation,
        conditions: Some(vec![DeploymentCondition {
            type_: "Available".to_string(),
            status: if running { "True" } else { "False" }.to_string(),
            last_update_time: started_at.map(to_k8s_time),
            last_transition_time: started_at.map(to_k8s_time),
            reason: Some(if running {
                "MinimumReplicasAvailable".to_string()
            } else {
                "MinimumReplicasUnavailable".to_string()
            }),
            message: None,
        }]),
        ..Default::default()
    });
    Ok(deployment)
}

pub fn container_to_statefulset(container: &EngineContainer) -> Result<StatefulSet> {
    let mut statefulset: StatefulSet = decode(last_applied(container)?)?;
    let running = container.state.is_running();
    statefulset.status = Some(StatefulSetStatus {
        replicas: 1,
        ready_replicas: Some(if running { 1 } else { 0 }),
        available_replicas: Some(if running { 1 } else { 0 }),
        current_replicas: Some(1),
        updated_replicas: Some(1),
        observed_generation: statefulset.metadata.generation,
        ..Default::default()
    });
    Ok(statefulset)
}

pub fn container_to_daemonset(container: &EngineContainer) -> Result<DaemonSet> {
    let mut daemonset: DaemonSet = decode(last_applied(container)?)?;
    let running = container.state.is_running();
    daemonset.status = Some(DaemonSetStatus {
        desired_number_scheduled: 1,
        current_number_scheduled: 1,
        number_available: Some(if running { 1 } else { 0 }),
        number_ready: if running { 1 } else { 0 },
        number_misscheduled: 0,
        updated_number_scheduled: Some(1),
        observed_generation: daemonset.metadata.generation,
        ..Default::default()
    });
    Ok(daemonset)
}

pub fn container_to_job(container: &EngineContainer) -> Result<Job> {
    let mut job: Job = decode(last_applied(container)?)?;
    let exit_code = container.exit_code;
    let (succeeded, failed, active) = match (container.state.is_running(), exit_code) {
        (true, _) => (0, 0, 1),
        (false, Some(0)) => (1, 0, 0),
        (false, Some(_)) => (0, 1, 0),
        (false, None) => (0, 0, 1),
    };
    let (start_time, finish_time) = container_start_finish(container);
    job.status = Some(JobStatus {
        succeeded: Some(succeeded),
        failed: Some(failed),
        active: Some(active),
        start_time: start_time.map(to_k8s_time),
        // Finish-time parsing is defensive-only; an unparseable or absent
        // timestamp simply leaves the field unset rather than failing the
        // whole read.
        completion_time: if container.state.is_running() { None } else { finish_time.map(to_k8s_time) },
        ..Default::default()
    });
    Ok(job)
}

/// Start/finish timestamps as reported by the engine's container inspect,
/// shared by every workload kind's status overlay.
pub fn container_start_finish(container: &EngineContainer) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (container.started_at, container.finished_at)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::model::RuntimeState;
    use std::collections::BTreeMap;

    fn base_container(labels: BTreeMap<String, String>) -> EngineContainer {
        EngineContainer {
            id: "abc".into(),
            name: "default-web".into(),
            image: "nginx:1.25".into(),
            state: RuntimeState::Running,
            exit_code: None,
            created_at: None,
            started_at: None,
            finished_at: None,
            labels,
            published_ports: vec![],
            networks: vec![],
        }
    }

    #[test]
    fn missing_last_applied_is_not_found() {
        let container = base_container(BTreeMap::new());
        let err = container_to_deployment(&container).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn running_container_yields_available_deployment() {
        let deployment_json = serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"selector": {"matchLabels": {}}, "template": {"metadata": {}, "spec": {"containers": []}}}
        });
        let mut labels = BTreeMap::new();
        labels.insert(
            naming::LABEL_LAST_APPLIED.to_string(),
            deployment_json.to_string(),
        );
        let container = base_container(labels);
        let deployment = container_to_deployment(&container).unwrap();
        let status = deployment.status.unwrap();
        assert_eq!(status.ready_replicas, Some(1));
        assert_eq!(status.unavailable_replicas, Some(0));
    }
}
