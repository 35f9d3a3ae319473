//! Secret sub-adapter: create, get, list and delete. Registry secrets
//! (`kubernetes.io/dockerconfigjson`) are additionally mirrored into the
//! registry-secret store by [`crate::registry_secret`].

use std::collections::BTreeMap;

use k2d_convert::engine::model::BindTarget;
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;

use k2d_store::{Bind, LabelSelector, StoredObject};

use crate::context::AdapterContext;

const TYPE_MARKER: &str = "secret";

pub async fn create(ctx: &AdapterContext, namespace: &str, secret: &Secret) -> Result<Secret> {
    let name = secret
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("secret has no name"))?;

    let mut data = BTreeMap::new();
    for (key, value) in secret.data.clone().unwrap_or_default() {
        data.insert(key, value.0);
    }
    for (key, value) in secret.string_data.clone().unwrap_or_default() {
        data.insert(key, value.into_bytes());
    }

    let mut labels = secret.metadata.labels.clone().unwrap_or_default();
    if let Some(type_) = &secret.type_ {
        labels.insert("k2d.io/secret-type".to_string(), type_.clone());
    }

    let object = StoredObject {
        name: name.clone(),
        namespace: namespace.to_string(),
        type_marker: TYPE_MARKER.to_string(),
        labels,
        created_at: ctx.now(),
        data,
    };
    ctx.store.put(object).await?;

    if secret.type_.as_deref() == Some("kubernetes.io/dockerconfigjson") {
        crate::registry_secret::mirror(ctx, namespace, &name, secret).await?;
    }

    get(ctx, namespace, &name).await
}

pub async fn get(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<Secret> {
    let object = ctx.store.get(TYPE_MARKER, namespace, name).await?;
    Ok(to_secret(&object))
}

pub async fn list(ctx: &AdapterContext, namespace: &str, selector: &LabelSelector) -> Result<Vec<Secret>> {
    let objects = ctx.store.list(TYPE_MARKER, namespace, selector).await?;
    Ok(objects.iter().map(to_secret).collect())
}

pub async fn delete(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    ctx.store.delete(TYPE_MARKER, namespace, name).await
}

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

fn to_secret(object: &StoredObject) -> Secret {
    let mut labels = object.labels.clone();
    let type_ = labels.remove("k2d.io/secret-type");

    let data = object
        .data
        .iter()
        .map(|(key, bytes)| (key.clone(), ByteString(bytes.clone())))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(object.name.clone()),
            namespace: Some(object.namespace.clone()),
            labels: Some(labels),
            creation_timestamp: Some(Time(object.created_at)),
            ..Default::default()
        },
        data: Some(data),
        type_,
        ..Default::default()
    }
}

pub fn volume_name(namespace: &str, name: &str) -> String {
    naming::secret_volume_name(namespace, name)
}
