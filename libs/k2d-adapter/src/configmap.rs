//! ConfigMap sub-adapter: create, get, list (with label selector) and
//! delete, backed by the auxiliary object store.

use std::collections::BTreeMap;

use k2d_convert::engine::model::BindTarget;
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;

use k2d_store::{Bind, LabelSelector, StoredObject};

use crate::context::AdapterContext;

const TYPE_MARKER: &str = "configmap";

pub async fn create(ctx: &AdapterContext, namespace: &str, config_map: &ConfigMap) -> Result<ConfigMap> {
    let name = config_map
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("configmap has no name"))?;

    let mut data = BTreeMap::new();
    for (key, value) in config_map.data.clone().unwrap_or_default() {
        data.insert(key, value.into_bytes());
    }

    let labels = config_map.metadata.labels.clone().unwrap_or_default();

    let object = StoredObject {
        name: name.clone(),
        namespace: namespace.to_string(),
        type_marker: TYPE_MARKER.to_string(),
        labels,
        created_at: ctx.now(),
        data,
    };
    ctx.store.put(object).await?;
    get(ctx, namespace, &name).await
}

pub async fn get(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<ConfigMap> {
    let object = ctx.store.get(TYPE_MARKER, namespace, name).await?;
    Ok(to_config_map(&object))
}

pub async fn list(ctx: &AdapterContext, namespace: &str, selector: &LabelSelector) -> Result<Vec<ConfigMap>> {
    let objects = ctx.store.list(TYPE_MARKER, namespace, selector).await?;
    Ok(objects.iter().map(to_config_map).collect())
}

pub async fn delete(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    ctx.store.delete(TYPE_MARKER, namespace, name).await
}

/// Decoded data plus per-key mount bind targets, for pod-spec conversion.
pub async fn load_for_refs(
    ctx: &AdapterContext,
    namespace: &str,
    name: &str,
) -> Result<(BTreeMap<String, String>, BTreeMap<String, BindTarget>)> {
    let object = ctx.store.get(TYPE_MARKER, namespace, name).await?;
    let data = object
        .data
        .iter()
        .map(|(key, bytes)| (key.clone(), String::from_utf8_lossy(bytes).into_owned()))
        .collect();

    let binds = ctx.store.binds(&object).await?;
    let targets = binds
        .into_iter()
        .map(|(key, bind)| {
            let target = match bind {
                Bind::HostPath(path) => BindTarget::HostPath(path),
                Bind::Volume(name) => BindTarget::Volume(name),
            };
            (key, target)
        })
        .collect();

    Ok((data, targets))
}

fn to_config_map(object: &StoredObject) -> ConfigMap {
    let data = object
        .data
        .iter()
        .map(|(key, bytes)| (key.clone(), String::from_utf8_lossy(bytes).into_owned()))
        .collect();

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(object.name.clone()),
            namespace: Some(object.namespace.clone()),
            labels: Some(object.labels.clone()),
            creation_timestamp: Some(Time(object.created_at)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

pub fn volume_name(namespace: &str, name: &str) -> String {
    naming::configmap_volume_name(namespace, name)
}
