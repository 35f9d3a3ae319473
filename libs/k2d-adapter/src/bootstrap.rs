//! One-time startup bootstrap and the reset-mode teardown routine.

use std::collections::{BTreeMap, HashMap};

use k2d_store::LabelSelector;
use k2d_util::error::Result;
use k2d_util::naming;

use crate::context::AdapterContext;

const SERVICE_ACCOUNT_SECRET_NAME: &str = "k2d-service-account";
const STORE_TYPE_MARKERS: [&str; 4] = ["configmap", "secret", "registry-secret", "pvc-binding"];

/// Ensures the default and system namespaces' networks exist, and seeds the
/// service-account credential secret. Idempotent: safe to run on every
/// startup.
pub async fn bootstrap(ctx: &AdapterContext) -> Result<()> {
    ensure_network(ctx, naming::DEFAULT_NAMESPACE).await?;
    ensure_network(ctx, naming::SYSTEM_NAMESPACE).await?;

    if let Some(service_account) = &ctx.service_account {
        let mut data = BTreeMap::new();
        data.insert("ca_cert_path".to_string(), service_account.ca_cert_path.clone().into_bytes());
        data.insert("token_path".to_string(), service_account.token_path.clone().into_bytes());

        let existing = ctx
            .store
            .get("secret", naming::SYSTEM_NAMESPACE, SERVICE_ACCOUNT_SECRET_NAME)
            .await;
        if existing.is_err() {
            ctx.store
                .put(k2d_store::StoredObject {
                    name: SERVICE_ACCOUNT_SECRET_NAME.to_string(),
                    namespace: naming::SYSTEM_NAMESPACE.to_string(),
                    type_marker: "secret".to_string(),
                    labels: BTreeMap::new(),
                    created_at: ctx.now(),
                    data,
                })
                .await?;
        }
    }

    Ok(())
}

async fn ensure_network(ctx: &AdapterContext, namespace: &str) -> Result<()> {
    let network_name = naming::network_name(namespace);
    if ctx.gateway.inspect_network(&network_name).await.is_ok() {
        return Ok(());
    }
    let mut labels: HashMap<String, String> = HashMap::new();
    labels.insert(naming::LABEL_NAMESPACE_NAME.to_string(), namespace.to_string());
    labels.insert(naming::LABEL_NETWORK_NAME.to_string(), network_name.clone());
    ctx.gateway.create_network(&network_name, &labels).await?;
    Ok(())
}

/// Tears down every engine object and store entry this process manages,
/// then returns. The caller exits the process with status 0 afterward.
pub async fn reset(ctx: &AdapterContext) -> Result<()> {
    let namespaces = crate::namespace::list(ctx)
        .await?
        .into_iter()
        .filter_map(|ns| ns.metadata.name)
        .collect::<Vec<_>>();

    let containers = ctx.gateway.list_containers(None).await.unwrap_or_default();
    for container in &containers {
        if container.labels.contains_key(naming::LABEL_WORKLOAD_NAME) {
            ctx.gateway.remove_container(&container.name, true).await.ok();
        }
    }

    let mut store_namespaces = namespaces.clone();
    if !store_namespaces.iter().any(|ns| ns == naming::SYSTEM_NAMESPACE) {
        store_namespaces.push(naming::SYSTEM_NAMESPACE.to_string());
    }
    for namespace in &store_namespaces {
        for type_marker in STORE_TYPE_MARKERS {
            let objects = ctx
                .store
                .list(type_marker, namespace, &LabelSelector::default())
                .await
                .unwrap_or_default();
            for object in objects {
                ctx.store.delete(type_marker, namespace, &object.name).await.ok();
            }
            let registry_objects = ctx
                .registry_store
                .list(type_marker, namespace, &LabelSelector::default())
                .await
                .unwrap_or_default();
            for object in registry_objects {
                ctx.registry_store.delete(type_marker, namespace, &object.name).await.ok();
            }
        }
    }

    let networks = ctx.gateway.list_networks(None).await.unwrap_or_default();
    for network in &networks {
        if network.labels.contains_key(naming::LABEL_NETWORK_NAME) || network.name == naming::DEFAULT_NETWORK_NAME {
            ctx.gateway.remove_network(&network.name).await.ok();
        }
    }

    let volumes = ctx.gateway.list_volumes(None).await.unwrap_or_default();
    for volume in &volumes {
        if volume.labels.contains_key(naming::LABEL_PV_NAME) {
            ctx.gateway.remove_volume(&volume.name, true).await.ok();
        }
    }

    Ok(())
}
