//! PersistentVolumeClaim sub-adapter: create, get, list and delete,
//! backed by an engine volume plus a store-resident binding record.

use std::collections::BTreeMap;

use k2d_convert::engine::storage::{naming_pv_name, pvc_binding_to_pvc, PvcBindingRecord};
use k2d_util::error::{Error, Result};
use k2d_util::naming::{self, SYSTEM_NAMESPACE};
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

use k2d_store::StoredObject;

use crate::context::AdapterContext;
use crate::last_applied;

const TYPE_MARKER: &str = "pvc-binding";

fn binding_name(namespace: &str, claim: &str) -> String {
    format!("{namespace}-{claim}")
}

pub async fn create(ctx: &AdapterContext, namespace: &str, pvc: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim> {
    let name = pvc
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::validation("persistentvolumeclaim has no name"))?;

    let pv_name = pvc
        .spec
        .as_ref()
        .and_then(|s| s.volume_name.clone())
        .unwrap_or_else(|| naming_pv_name(namespace, &name));

    if ctx.gateway.inspect_volume(&pv_name).await.is_err() {
        let mut labels = BTreeMap::new();
        labels.insert(naming::LABEL_PV_NAME.to_string(), pv_name.clone());
        labels.insert(naming::LABEL_PVC_NAME.to_string(), name.clone());
        labels.insert(naming::LABEL_NAMESPACE_NAME.to_string(), namespace.to_string());
        ctx.gateway
            .create_volume(&pv_name, &labels.into_iter().collect())
            .await?;
    }

    let last_applied = last_applied::resolve(pvc, pvc.metadata.annotations.as_ref())?;
    let mut labels = BTreeMap::new();
    labels.insert(naming::LABEL_PV_NAME.to_string(), pv_name.clone());
    labels.insert(naming::LABEL_PVC_NAME.to_string(), name.clone());
    labels.insert(naming::LABEL_NAMESPACE_NAME.to_string(), namespace.to_string());

    let object = StoredObject {
        name: binding_name(namespace, &name),
        namespace: SYSTEM_NAMESPACE.to_string(),
        type_marker: TYPE_MARKER.to_string(),
        labels,
        created_at: ctx.now(),
        data: BTreeMap::from([("last-applied".to_string(), last_applied.into_bytes())]),
    };
    ctx.store.put(object).await?;

    get(ctx, namespace, &name).await
}

pub async fn get(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<PersistentVolumeClaim> {
    let object = ctx
        .store
        .get(TYPE_MARKER, SYSTEM_NAMESPACE, &binding_name(namespace, name))
        .await?;
    pvc_binding_to_pvc(&to_binding_record(&object)?)
}

pub async fn list(ctx: &AdapterContext, namespace: &str) -> Result<Vec<PersistentVolumeClaim>> {
    let selector = k2d_store::LabelSelector::new().with(naming::LABEL_NAMESPACE_NAME, namespace);
    let objects = ctx.store.list(TYPE_MARKER, SYSTEM_NAMESPACE, &selector).await?;
    objects
        .iter()
        .map(|object| pvc_binding_to_pvc(&to_binding_record(object)?))
        .collect()
}

/// Removes only the binding record; the PV persists and its phase
/// transitions to `Released`. This lets the underlying volume survive PVC
/// churn (Retain semantics).
pub async fn delete(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<()> {
    ctx.store
        .delete(TYPE_MARKER, SYSTEM_NAMESPACE, &binding_name(namespace, name))
        .await
}

fn to_binding_record(object: &StoredObject) -> Result<PvcBindingRecord> {
    let last_applied = object
        .data
        .get("last-applied")
        .ok_or_else(|| Error::conversion("pvc binding record has no last-applied entry"))?;
    Ok(PvcBindingRecord {
        pv_name: object
            .labels
            .get(naming::LABEL_PV_NAME)
            .cloned()
            .unwrap_or_default(),
        pvc_name: object
            .labels
            .get(naming::LABEL_PVC_NAME)
            .cloned()
            .unwrap_or_default(),
        namespace: object
            .labels
            .get(naming::LABEL_NAMESPACE_NAME)
            .cloned()
            .unwrap_or_default(),
        last_applied: String::from_utf8_lossy(last_applied).into_owned(),
    })
}
