//! StorageClass sub-adapter: one hardcoded `local` class, default,
//! provisioner `k2d.io/local`, reclaim `Retain`, binding
//! `WaitForFirstConsumer`. Never backed by the engine; always synthesized.

use k2d_util::error::{Error, Result};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::ObjectMeta;

pub const LOCAL_STORAGE_CLASS_NAME: &str = "local";

fn local_storage_class() -> StorageClass {
    StorageClass {
        metadata: ObjectMeta {
            name: Some(LOCAL_STORAGE_CLASS_NAME.to_string()),
            annotations: Some(std::collections::BTreeMap::from([(
                "storageclass.kubernetes.io/is-default-class".to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        },
        provisioner: "k2d.io/local".to_string(),
        reclaim_policy: Some("Retain".to_string()),
        volume_binding_mode: Some("WaitForFirstConsumer".to_string()),
        ..Default::default()
    }
}

pub fn get(name: &str) -> Result<StorageClass> {
    if name == LOCAL_STORAGE_CLASS_NAME {
        Ok(local_storage_class())
    } else {
        Err(Error::not_found(format!("storageclass {name}")))
    }
}

pub fn list() -> Vec<StorageClass> {
    vec![local_storage_class()]
}
