//! Volume ↔ PersistentVolume, and PVC-binding record → PersistentVolumeClaim.

use k2d_util::error::{Error, Result};
use k2d_util::naming;

use k8s_openapi::api::core::v1::{
    HostPathVolumeSource, ObjectReference, PersistentVolume, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimStatus, PersistentVolumeSpec,
    PersistentVolumeStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;

use super::model::EngineVolume;
use super::time::to_k8s_time;

/// The auxiliary-store entry that exists iff a claim is Bound, recording
/// the PV/PVC name labels and the claim's last-applied JSON.
#[derive(Debug, Clone)]
pub struct PvcBindingRecord {
    pub pv_name: String,
    pub pvc_name: String,
    pub namespace: String,
    pub last_applied: String,
}

pub fn volume_to_pv(volume: &EngineVolume, binding: Option<&PvcBindingRecord>) -> Result<PersistentVolume> {
    let phase = if binding.is_some() { "Bound" } else { "Released" };
    let claim_ref = binding.map(|b| ObjectReference {
        kind: Some("PersistentVolumeClaim".to_string()),
        name: Some(b.pvc_name.clone()),
        namespace: Some(b.namespace.clone()),
        ..Default::default()
    });

    Ok(PersistentVolume {
        metadata: ObjectMeta {
            name: Some(volume.name.clone()),
            creation_timestamp: volume.created_at.map(to_k8s_time),
            labels: Some(volume.labels.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            host_path: Some(HostPathVolumeSource {
                path: volume.mountpoint.clone(),
                type_: None,
            }),
            capacity: None,
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            persistent_volume_reclaim_policy: Some("Retain".to_string()),
            storage_class_name: Some("local".to_string()),
            claim_ref,
            ..Default::default()
        }),
        status: Some(PersistentVolumeStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    })
}

pub fn pvc_binding_to_pvc(binding: &PvcBindingRecord) -> Result<PersistentVolumeClaim> {
    let mut pvc: PersistentVolumeClaim = serde_json::from_str(&binding.last_applied)
        .map_err(|e| Error::Serialization("decoding pvc last-applied".into(), e))?;
    pvc.status = Some(PersistentVolumeClaimStatus {
        phase: Some("Bound".to_string()),
        access_modes: Some(vec!["ReadWriteOnce".to_string()]),
        capacity: pvc
            .spec
            .as_ref()
            .and_then(|s| s.resources.as_ref())
            .and_then(|r| r.requests.clone()),
        ..Default::default()
    });
    Ok(pvc)
}

pub fn default_storage_request(pvc_spec: &PersistentVolumeClaimSpec) -> Option<Quantity> {
    pvc_spec
        .resources
        .as_ref()
        .and_then(|r| r.requests.as_ref())
        .and_then(|m| m.get("storage"))
        .cloned()
}

pub fn naming_pv_name(namespace: &str, claim: &str) -> String {
    naming::pv_name(namespace, claim)
}
