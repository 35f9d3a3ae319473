//! Node synthesis. Always built fresh from engine info on every read;
//! never persisted.

use chrono::{DateTime, Utc};

use k8s_openapi::api::core::v1::{
    Node, NodeAddress, NodeCondition, NodeStatus, NodeSystemInfo,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;

use super::model::EngineSystemInfo;
use super::time::to_k8s_time;

pub fn synthesize_node(info: &EngineSystemInfo, advertise_ip: &str, start_time: DateTime<Utc>) -> Node {
    let mut capacity = std::collections::BTreeMap::new();
    capacity.insert("cpu".to_string(), Quantity(info.ncpu.to_string()));
    capacity.insert(
        "memory".to_string(),
        Quantity(format!("{}Ki", info.mem_total_bytes / 1024)),
    );
    capacity.insert("pods".to_string(), Quantity("110".to_string()));

    Node {
        metadata: ObjectMeta {
            name: Some(info.node_name.clone()),
            creation_timestamp: Some(to_k8s_time(start_time)),
            labels: Some(std::collections::BTreeMap::from([
                (
                    "kubernetes.io/arch".to_string(),
                    info.architecture.clone(),
                ),
                ("kubernetes.io/os".to_string(), info.os_type.clone()),
                ("kubernetes.io/hostname".to_string(), info.node_name.clone()),
            ])),
            ..Default::default()
        },
        spec: None,
        status: Some(NodeStatus {
            addresses: Some(vec![NodeAddress {
                type_: "InternalIP".to_string(),
                address: advertise_ip.to_string(),
            }]),
            capacity: Some(capacity.clone()),
            allocatable: Some(capacity),
            node_info: Some(NodeSystemInfo {
                architecture: info.architecture.clone(),
                operating_system: info.os_type.clone(),
                kernel_version: info.kernel_version.clone(),
                kubelet_version: format!("docker-{}", info.engine_version),
                kube_proxy_version: format!("docker-{}", info.engine_version),
                container_runtime_version: format!("docker://{}", info.engine_version),
                ..Default::default()
            }),
            conditions: Some(vec![NodeCondition {
                type_: "Ready".to_string(),
                status: "True".to_string(),
                reason: Some("KubeletReady".to_string()),
                message: Some("k2d reports the engine host as always ready".to_string()),
                last_heartbeat_time: Some(to_k8s_time(Utc::now())),
                last_transition_time: Some(to_k8s_time(start_time)),
            }]),
            ..Default::default()
        }),
    }
}
