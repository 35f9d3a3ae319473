//! Namespace sub-adapter: create, get, list and delete, backed one-to-one
//! by engine networks.

use std::collections::HashMap;

use k2d_convert::engine::namespace::network_to_namespace;
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k8s_openapi::api::core::v1::Namespace;

use crate::context::AdapterContext;
use crate::last_applied;

pub async fn create(ctx: &AdapterContext, namespace: &Namespace) -> Result<Namespace> {
    let name = namespace
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("namespace has no name"))?;
    let network_name = naming::network_name(&name);

    if ctx.gateway.inspect_network(&network_name).await.is_ok() {
        return get(ctx, &name).await;
    }

    let last_applied = last_applied::resolve(namespace, namespace.metadata.annotations.as_ref())?;
    let mut labels: HashMap<String, String> = HashMap::new();
    labels.insert(naming::LABEL_NAMESPACE_NAME.to_string(), name.clone());
    labels.insert(naming::LABEL_NETWORK_NAME.to_string(), network_name.clone());
    labels.insert(naming::LABEL_LAST_APPLIED.to_string(), last_applied);

    ctx.gateway.create_network(&network_name, &labels).await?;
    get(ctx, &name).await
}

pub async fn get(ctx: &AdapterContext, name: &str) -> Result<Namespace> {
    let network_name = naming::network_name(name);
    let network = ctx.gateway.inspect_network(&network_name).await?;
    network_to_namespace(&network)
}

pub async fn list(ctx: &AdapterContext) -> Result<Vec<Namespace>> {
    let networks = ctx.gateway.list_networks(None).await?;
    networks
        .iter()
        .filter(|n| n.labels.contains_key(naming::LABEL_NAMESPACE_NAME) || n.name == naming::DEFAULT_NETWORK_NAME)
        .map(network_to_namespace)
        .collect()
}

pub async fn delete(ctx: &AdapterContext, name: &str) -> Result<()> {
    let network_name = naming::network_name(name);
    ctx.gateway.remove_network(&network_name).await
}
