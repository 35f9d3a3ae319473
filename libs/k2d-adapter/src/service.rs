//! Service sub-adapter: mutates the selected workload container's
//! published ports and network aliases in place via the transactional
//! replace path, rather than creating a separate engine object per
//! Service.

use std::collections::BTreeSet;

use k2d_convert::engine::container::{
    apply_service_to_container, container_to_service, pod_spec_to_container, PodConversionContext,
    ServiceAccountMount,
};
use k2d_convert::engine::model::EngineContainer;
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k8s_openapi::api::core::v1::{PodSpec, Service};

use crate::context::AdapterContext;
use crate::{last_applied, refs, replace};

async fn find_target(ctx: &AdapterContext, namespace: &str, service: &Service) -> Result<EngineContainer> {
    let selector = service
        .spec
        .as_ref()
        .and_then(|s| s.selector.clone())
        .ok_or_else(|| Error::validation("service has no selector"))?;

    let containers = ctx
        .gateway
        .list_containers(Some((naming::LABEL_NAMESPACE_NAME, namespace)))
        .await?;

    let mut matches: Vec<EngineContainer> = containers
        .into_iter()
        .filter(|c| {
            c.label(naming::LABEL_WORKLOAD_NAME)
                .is_some_and(|workload_name| selector.values().any(|v| v == workload_name))
        })
        .collect();

    match matches.len() {
        0 => Err(Error::not_found("no workload matches the service selector")),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::validation("service selector matches more than one workload")),
    }
}

async fn used_node_ports(ctx: &AdapterContext) -> Result<BTreeSet<u16>> {
    let containers = ctx.gateway.list_containers(None).await?;
    Ok(containers
        .iter()
        .flat_map(|c| c.published_ports.iter())
        .filter_map(|p| p.host_port)
        .collect())
}

async fn rebuild_container_spec(
    ctx: &AdapterContext,
    namespace: &str,
    container: &EngineContainer,
) -> Result<k2d_convert::engine::model::ContainerCreateSpec> {
    let pod_spec_json = container
        .label(naming::LABEL_POD_LAST_APPLIED)
        .ok_or_else(|| Error::conversion("container has no pod last-applied-configuration label"))?;
    let pod_spec: PodSpec = serde_json::from_str(pod_spec_json)
        .map_err(|e| Error::Serialization("decoding pod spec for service mutation".into(), e))?;

    let resolved = refs::resolve(ctx, namespace, &pod_spec).await?;
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
    let mut spec = pod_spec_to_container(&pod_spec, &resolved, &conversion_ctx)?;
    spec.labels = container.labels.clone();
    Ok(spec)
}

pub async fn create(ctx: &AdapterContext, namespace: &str, service: &Service) -> Result<Service> {
    let name = service
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("service has no name"))?;
    let target = find_target(ctx, namespace, service).await?;
    let mut spec = rebuild_container_spec(ctx, namespace, &target).await?;

    let workload_last_applied = last_applied::resolve(service, service.metadata.annotations.as_ref())?;
    spec.labels.insert(naming::LABEL_SERVICE_NAME.to_string(), name.clone());
    spec.labels.insert(naming::LABEL_SERVICE_LAST_APPLIED.to_string(), workload_last_applied);

    let service_spec = service
        .spec
        .as_ref()
        .ok_or_else(|| Error::validation("service has no spec"))?;
    let ports_in_use = used_node_ports(ctx).await?;
    apply_service_to_container(&name, namespace, service_spec, &ports_in_use, &mut spec)?;

    let container_name = &target.name;
    replace::replace_in_place(&ctx.gateway, container_name, &spec).await?;
    get(ctx, namespace, &name).await
}

pub async fn get(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<Service> {
    let container = find_by_service_name(ctx, namespace, name).await?;
    container_to_service(&container, namespace, &ctx.advertise_ip)?
        .ok_or_else(|| Error::not_found(format!("service {namespace}/{name}")))
}

pub async fn list(ctx: &AdapterContext, namespace: &str) -> Result<Vec<Service>> {
    let containers = ctx
        .gateway
        .list_containers(Some((naming::LABEL_NAMESPACE_NAME, namespace)))
        .await?;
    let mut services = Vec::new();
    for container in &containers {
        if let Some(service) = container_to_service(container, namespace, &ctx.advertise_ip)? {
            services.push(service);
        }
    }
    Ok(services)
}

pub async fn delete(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    let container = find_by_service_name(ctx, namespace, name).await?;
    // Deleting a Service strips both the service-name label and the
    // service last-applied label from the surviving container, rather
    // than removing the container itself.
    let mut spec = rebuild_container_spec(ctx, namespace, &container).await?;
    spec.labels.remove(naming::LABEL_SERVICE_NAME);
    spec.labels.remove(naming::LABEL_SERVICE_LAST_APPLIED);
    spec.network_aliases.clear();
    spec.host_ports.retain(|p| p.host_port.is_none());

    replace::replace_in_place(&ctx.gateway, &container.name, &spec).await.map(|_| ())
}

async fn find_by_service_name(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<EngineContainer> {
    let containers = ctx
        .gateway
        .list_containers(Some((naming::LABEL_NAMESPACE_NAME, namespace)))
        .await?;
    containers
        .into_iter()
        .find(|c| c.label(naming::LABEL_SERVICE_NAME) == Some(name))
        .ok_or_else(|| Error::not_found(format!("service {namespace}/{name}")))
}
