//! Deployment/StatefulSet/DaemonSet/Job sub-adapter. All four kinds share
//! the one-workload-one-container model; only the reconstruction
//! (`container_to_*`) and the pod template's field path differ.

use k2d_convert::engine::container::{pod_spec_to_container, PodConversionContext, ServiceAccountMount};
use k2d_convert::engine::workload::{
    container_to_daemonset, container_to_deployment, container_to_job, container_to_statefulset,
};
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::PodSpec;
use kube::api::ObjectMeta;
use serde::Serialize;

use crate::context::AdapterContext;
use crate::{image_pull, last_applied, refs, replace};

async fn create_workload<T: Serialize>(
    ctx: &AdapterContext,
    namespace: &str,
    kind: &str,
    metadata: &ObjectMeta,
    pod_spec: &PodSpec,
    whole_object: &T,
) -> Result<k2d_convert::engine::model::EngineContainer> {
    let name = metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation(format!("{kind} has no name")))?;

    let resolved = refs::resolve(ctx, namespace, pod_spec).await?;
    let conversion_ctx = PodConversionContext {
        namespace,
        network_name: naming::network_name(namespace),
        cluster_service_host: ctx.cluster_service_host(),
        cluster_service_port: ctx.cluster_service_port(),
        service_account: ctx.service_account.as_ref().map(|sa| ServiceAccountMount {
            ca_cert_path: sa.ca_cert_path.clone(),
            token_path: sa.token_path.clone(),
        }),
    };

    let mut spec = pod_spec_to_container(pod_spec, &resolved, &conversion_ctx)?;

    let container_name = naming::container_name(namespace, &name);
    let workload_last_applied = last_applied::resolve(whole_object, metadata.annotations.as_ref())?;
    let pod_last_applied = serde_json::to_string(pod_spec)
        .map_err(|e| Error::Serialization("serializing pod spec for pod reconstruction".into(), e))?;

    spec.labels.insert(naming::LABEL_NAMESPACE_NAME.to_string(), namespace.to_string());
    spec.labels.insert(naming::LABEL_WORKLOAD_TYPE.to_string(), kind.to_string());
    spec.labels.insert(naming::LABEL_WORKLOAD_NAME.to_string(), name.clone());
    spec.labels.insert(naming::LABEL_LAST_APPLIED.to_string(), workload_last_applied.clone());
    spec.labels.insert(naming::LABEL_POD_LAST_APPLIED.to_string(), pod_last_applied);

    image_pull::pull(
        ctx,
        namespace,
        &spec.image,
        pod_spec.image_pull_secrets.as_deref().unwrap_or_default(),
    )
    .await?;

    replace::create_or_replace(&ctx.gateway, &container_name, &workload_last_applied, &spec).await
}

pub async fn create_deployment(ctx: &AdapterContext, namespace: &str, deployment: &Deployment) -> Result<Deployment> {
    let pod_spec = deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.clone())
        .ok_or_else(|| Error::validation("deployment has no pod template spec"))?;
    let container = create_workload(ctx, namespace, "deployment", &deployment.metadata, &pod_spec, deployment).await?;
    container_to_deployment(&container)
}

pub async fn get_deployment(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<Deployment> {
    let container = ctx.gateway.inspect_container(&naming::container_name(namespace, name)).await?;
    container_to_deployment(&container)
}

pub async fn list_deployments(ctx: &AdapterContext, namespace: &str) -> Result<Vec<Deployment>> {
    list_by_kind(ctx, namespace, "deployment", container_to_deployment).await
}

pub async fn delete_deployment(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    delete_workload(ctx, namespace, name).await
}

pub async fn create_statefulset(ctx: &AdapterContext, namespace: &str, statefulset: &StatefulSet) -> Result<StatefulSet> {
    let pod_spec = statefulset
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.clone())
        .ok_or_else(|| Error::validation("statefulset has no pod template spec"))?;
    let container = create_workload(ctx, namespace, "statefulset", &statefulset.metadata, &pod_spec, statefulset).await?;
    container_to_statefulset(&container)
}

pub async fn get_statefulset(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<StatefulSet> {
    let container = ctx.gateway.inspect_container(&naming::container_name(namespace, name)).await?;
    container_to_statefulset(&container)
}

pub async fn list_statefulsets(ctx: &AdapterContext, namespace: &str) -> Result<Vec<StatefulSet>> {
    list_by_kind(ctx, namespace, "statefulset", container_to_statefulset).await
}

pub async fn delete_statefulset(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    delete_workload(ctx, namespace, name).await
}

pub async fn create_daemonset(ctx: &AdapterContext, namespace: &str, daemonset: &DaemonSet) -> Result<DaemonSet> {
    let pod_spec = daemonset
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.clone())
        .ok_or_else(|| Error::validation("daemonset has no pod template spec"))?;
    let container = create_workload(ctx, namespace, "daemonset", &daemonset.metadata, &pod_spec, daemonset).await?;
    container_to_daemonset(&container)
}

pub async fn get_daemonset(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<DaemonSet> {
    let container = ctx.gateway.inspect_container(&naming::container_name(namespace, name)).await?;
    container_to_daemonset(&container)
}

pub async fn list_daemonsets(ctx: &AdapterContext, namespace: &str) -> Result<Vec<DaemonSet>> {
    list_by_kind(ctx, namespace, "daemonset", container_to_daemonset).await
}

pub async fn delete_daemonset(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    delete_workload(ctx, namespace, name).await
}

pub async fn create_job(ctx: &AdapterContext, namespace: &str, job: &Job) -> Result<Job> {
    let pod_spec = job
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.clone())
        .ok_or_else(|| Error::validation("job has no pod template spec"))?;
    let container = create_workload(ctx, namespace, "job", &job.metadata, &pod_spec, job).await?;
    container_to_job(&container)
}

pub async fn get_job(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<Job> {
    let container = ctx.gateway.inspect_container(&naming::container_name(namespace, name)).await?;
    container_to_job(&container)
}

pub async fn list_jobs(ctx: &AdapterContext, namespace: &str) -> Result<Vec<Job>> {
    list_by_kind(ctx, namespace, "job", container_to_job).await
}

pub async fn delete_job(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    delete_workload(ctx, namespace, name).await
}

async fn delete_workload(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    let container_name = naming::container_name(namespace, name);
    ctx.gateway.inspect_container(&container_name).await?;
    ctx.gateway.remove_container(&container_name, true).await
}

async fn list_by_kind<T>(
    ctx: &AdapterContext,
    namespace: &str,
    kind: &str,
    convert: impl Fn(&k2d_convert::engine::model::EngineContainer) -> Result<T>,
) -> Result<Vec<T>> {
    let containers = ctx
        .gateway
        .list_containers(Some((naming::LABEL_NAMESPACE_NAME, namespace)))
        .await?;
    containers
        .iter()
        .filter(|c| c.label(naming::LABEL_WORKLOAD_TYPE) == Some(kind))
        .map(convert)
        .collect()
}
