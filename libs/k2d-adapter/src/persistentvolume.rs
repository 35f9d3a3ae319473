//! PersistentVolume sub-adapter. PVs are never created directly by a
//! client in this system; they come into being as a side effect of a PVC
//! create and are read back from the engine volume plus an optional
//! binding record.

use k2d_convert::engine::storage::{volume_to_pv, PvcBindingRecord};
use k2d_util::error::Result;
use k2d_util::naming::{self, SYSTEM_NAMESPACE};
use k8s_openapi::api::core::v1::PersistentVolume;

use crate::context::AdapterContext;

const TYPE_MARKER: &str = "pvc-binding";

async fn binding_for_pv(ctx: &AdapterContext, pv_name: &str) -> Option<PvcBindingRecord> {
    let objects = ctx
        .store
        .list(TYPE_MARKER, SYSTEM_NAMESPACE, &k2d_store::LabelSelector::new())
        .await
        .ok()?;
    objects.into_iter().find_map(|object| {
        if object.labels.get(naming::LABEL_PV_NAME).map(String::as_str) != Some(pv_name) {
            return None;
        }
        let last_applied = object.data.get("last-applied")?;
        Some(PvcBindingRecord {
            pv_name: pv_name.to_string(),
            pvc_name: object.labels.get(naming::LABEL_PVC_NAME).cloned().unwrap_or_default(),
            namespace: object.labels.get(naming::LABEL_NAMESPACE_NAME).cloned().unwrap_or_default(),
            last_applied: String::from_utf8_lossy(last_applied).into_owned(),
        })
    })
}

pub async fn get(ctx: &AdapterContext, name: &str) -> Result<PersistentVolume> {
    let volume = ctx.gateway.inspect_volume(name).await?;
    let binding = binding_for_pv(ctx, name).await;
    volume_to_pv(&volume, binding.as_ref())
}

pub async fn list(ctx: &AdapterContext) -> Result<Vec<PersistentVolume>> {
    let volumes = ctx.gateway.list_volumes(None).await?;
    let mut out = Vec::with_capacity(volumes.len());
    for volume in volumes {
        if !volume.labels.contains_key(naming::LABEL_PV_NAME) {
            continue;
        }
        let binding = binding_for_pv(ctx, &volume.name).await;
        out.push(volume_to_pv(&volume, binding.as_ref())?);
    }
    Ok(out)
}

pub async fn delete(ctx: &AdapterContext, name: &str) -> Result<()> {
    ctx.gateway.remove_volume(name, false).await
}
