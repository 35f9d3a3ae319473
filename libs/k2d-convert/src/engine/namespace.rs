//! Network → Namespace conversion.

use k2d_util::error::{Error, Result};
use k2d_util::naming;

use k8s_openapi::api::core::v1::{Namespace, NamespaceSpec, NamespaceStatus};
use kube::api::ObjectMeta;

use super::model::EngineNetwork;
use super::time::to_k8s_time;

pub fn network_to_namespace(network: &EngineNetwork) -> Result<Namespace> {
    let name = naming::namespace_from_network_name(&network.name);

    if let Some(json) = network.labels.get(naming::LABEL_LAST_APPLIED) {
        let mut namespace: Namespace = serde_json::from_str(json)
            .map_err(|e| Error::Serialization("decoding namespace last-applied".into(), e))?;
        namespace.status = Some(NamespaceStatus {
            phase: Some("Active".to_string()),
            ..Default::default()
        });
        return Ok(namespace);
    }

    Ok(Namespace {
        metadata: ObjectMeta {
            name: Some(name),
            creation_timestamp: network.created_at.map(to_k8s_time),
            ..Default::default()
        },
        spec: Some(NamespaceSpec::default()),
        status: Some(NamespaceStatus {
            phase: Some("Active".to_string()),
            ..Default::default()
        }),
    })
}
