//! Pod sub-adapter: create, get, delete and list bare Pods, one engine
//! container each.

use k2d_convert::engine::container::{container_to_pod, pod_spec_to_container, PodConversionContext};
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k8s_openapi::api::core::v1::Pod;

use crate::context::AdapterContext;
use crate::{image_pull, last_applied, refs, replace};

pub async fn create(ctx: &AdapterContext, namespace: &str, pod: &Pod) -> Result<Pod> {
    let name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("pod has no name"))?;
    let pod_spec = pod
        .spec
        .clone()
        .ok_or_else(|| Error::validation("pod has no spec"))?;

    let resolved = refs::resolve(ctx, namespace, &pod_spec).await?;
    let conversion_ctx = PodConversionContext {
        namespace,
        network_name: naming::network_name(namespace),
        cluster_service_host: ctx.cluster_service_host(),
        cluster_service_port: ctx.cluster_service_port(),
        service_account: ctx.service_account.as_ref().map(|sa| {
            k2d_convert::engine::container::ServiceAccountMount {
                ca_cert_path: sa.ca_cert_path.clone(),
                token_path: sa.token_path.clone(),
            }
        }),
    };

    let mut spec = pod_spec_to_container(&pod_spec, &resolved, &conversion_ctx)?;

    let container_name = naming::container_name(namespace, &name);
    let last_applied = last_applied::resolve(pod, pod.metadata.annotations.as_ref())?;
    spec.labels.insert(naming::LABEL_NAMESPACE_NAME.to_string(), namespace.to_string());
    spec.labels.insert(naming::LABEL_WORKLOAD_TYPE.to_string(), "pod".to_string());
    spec.labels.insert(naming::LABEL_WORKLOAD_NAME.to_string(), name.clone());
    spec.labels.insert(naming::LABEL_POD_LAST_APPLIED.to_string(), last_applied.clone());
    spec.labels.insert(naming::LABEL_LAST_APPLIED.to_string(), last_applied.clone());

    image_pull::pull(
        ctx,
        namespace,
        &spec.image,
        pod_spec.image_pull_secrets.as_deref().unwrap_or_default(),
    )
    .await?;

    let engine_container = replace::create_or_replace(&ctx.gateway, &container_name, &last_applied, &spec).await?;
    container_to_pod(&engine_container, namespace)
}

pub async fn get(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<Pod> {
    let container_name = naming::container_name(namespace, name);
    let container = ctx.gateway.inspect_container(&container_name).await?;
    container_to_pod(&container, namespace)
}

pub async fn delete(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    let container_name = naming::container_name(namespace, name);
    ctx.gateway.inspect_container(&container_name).await?;
    ctx.gateway.remove_container(&container_name, true).await
}

/// Lists pods in `namespace`: containers filtered by namespace label; when
/// listing the default namespace, containers lacking a namespace label are
/// treated as belonging to it.
pub async fn list(ctx: &AdapterContext, namespace: &str) -> Result<Vec<Pod>> {
    let containers = ctx
        .gateway
        .list_containers(Some((naming::LABEL_NAMESPACE_NAME, namespace)))
        .await?;

    let mut pods: Vec<Pod> = containers
        .iter()
        .map(|c| container_to_pod(c, namespace))
        .collect::<Result<_>>()?;

    if namespace == naming::DEFAULT_NAMESPACE {
        let unlabeled = ctx.gateway.list_containers(None).await?;
        for container in unlabeled {
            if container.label(naming::LABEL_NAMESPACE_NAME).is_none() {
                pods.push(container_to_pod(&container, naming::DEFAULT_NAMESPACE)?);
            }
        }
    }

    Ok(pods)
}
