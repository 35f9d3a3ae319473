//! Reserved label/annotation vocabulary and engine-object naming.
//!
//! This is a closed set. The adapter never reads a label outside this
//! list; the converter never writes one outside it. Changing a key here
//! is a breaking change to every engine object already on disk.

/// Kind of workload the engine container backs (`deployment`, `statefulset`, ...).
pub const LABEL_WORKLOAD_TYPE: &str = "workload.k2d.io/type";
/// Workload name, equal to the Kubernetes resource name.
pub const LABEL_WORKLOAD_NAME: &str = "workload.k2d.io/name";
/// Name of the Service currently selecting this container, if any.
pub const LABEL_SERVICE_NAME: &str = "workload.k2d.io/service-name";

/// Last-applied JSON for the workload object family (Deployment/StatefulSet/DaemonSet/Job).
pub const LABEL_LAST_APPLIED: &str = "resource.k2d.io/last-applied-configuration";
/// Last-applied JSON for the pod-spec slice, used to rebuild a bare Pod.
pub const LABEL_POD_LAST_APPLIED: &str = "resource.k2d.io/pod/last-applied-configuration";
/// Last-applied JSON for the Service spec selecting this container.
pub const LABEL_SERVICE_LAST_APPLIED: &str = "resource.k2d.io/service/last-applied-configuration";
/// Namespace name, set on containers, networks, volumes and store entries.
pub const LABEL_NAMESPACE_NAME: &str = "resource.k2d.io/namespace-name";

/// Network name, set on networks (and mirrored onto namespace-scoped store entries).
pub const LABEL_NETWORK_NAME: &str = "networking.k2d.io/network-name";

/// PersistentVolume name, set on volumes and PVC-binding records.
pub const LABEL_PV_NAME: &str = "storage.k2d.io/pv-name";
/// PersistentVolumeClaim name, set on PVC-binding records.
pub const LABEL_PVC_NAME: &str = "storage.k2d.io/pvc-name";

/// Filesystem store: RFC3339 creation timestamp recorded in object metadata.
pub const LABEL_FS_CREATION_TIMESTAMP: &str = "store.k2d.io/filesystem/creation-timestamp";
/// Filesystem store: prefix for the per-key `store.k2d.io/filesystem/path/{key}` label.
pub const LABEL_FS_PATH_PREFIX: &str = "store.k2d.io/filesystem/path/";

/// Volume store: kind of resource the volume backs (`configmap`, `secret`, ...).
pub const LABEL_VOLUME_RESOURCE_TYPE: &str = "store.k2d.io/volume/resource-type";
/// Volume store: name of the engine volume holding the object's data.
pub const LABEL_VOLUME_VOLUME_NAME: &str = "store.k2d.io/volume/volume-name";

/// Standard kubectl annotation, honored when present on an incoming object.
pub const ANNOTATION_LAST_APPLIED_CONFIG: &str = "kubectl.kubernetes.io/last-applied-configuration";

pub const DEFAULT_NAMESPACE: &str = "default";
/// System namespace hosting PVC-binding records and the service-account secret.
pub const SYSTEM_NAMESPACE: &str = "k2d";

/// Historical network name for the default namespace; MUST be reported back as `default`.
pub const DEFAULT_NETWORK_NAME: &str = "k2d_net";

pub fn container_name(namespace: &str, workload: &str) -> String {
    format!("{namespace}-{workload}")
}

/// Transient name used while replacing a container in place (spec glossary: "shadow name").
pub fn shadow_name(final_name: &str) -> String {
    format!("{final_name}_temp")
}

/// Network name for a namespace, honoring the default namespace's historical alias.
pub fn network_name(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        DEFAULT_NETWORK_NAME.to_string()
    } else {
        format!("k2d-{namespace}")
    }
}

/// Inverse of [`network_name`]: recover the Kubernetes namespace name from an engine network name.
pub fn namespace_from_network_name(network: &str) -> String {
    if network == DEFAULT_NETWORK_NAME {
        DEFAULT_NAMESPACE.to_string()
    } else {
        network
            .strip_prefix("k2d-")
            .unwrap_or(network)
            .to_string()
    }
}

pub fn pv_name(namespace: &str, claim: &str) -> String {
    format!("k2d-pv-{namespace}-{claim}")
}

pub fn configmap_volume_name(namespace: &str, name: &str) -> String {
    format!("configmap-{namespace}-{name}")
}

pub fn secret_volume_name(namespace: &str, name: &str) -> String {
    format!("secret-{namespace}-{name}")
}

/// Engine container names carry a leading `/` in some engine APIs; strip it before comparison.
pub fn strip_leading_slash(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// The four DNS aliases attached to a workload container's network endpoint for a Service.
pub fn service_alias_set(service: &str, namespace: &str) -> [String; 4] {
    [
        service.to_string(),
        format!("{service}.{namespace}"),
        format!("{service}.{namespace}.svc"),
        format!("{service}.{namespace}.svc.cluster.local"),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_namespace_network_round_trips() {
        let net = network_name(DEFAULT_NAMESPACE);
        assert_eq!(net, DEFAULT_NETWORK_NAME);
        assert_eq!(namespace_from_network_name(&net), DEFAULT_NAMESPACE);
    }

    #[test]
    fn other_namespace_network_round_trips() {
        let net = network_name("staging");
        assert_eq!(net, "k2d-staging");
        assert_eq!(namespace_from_network_name(&net), "staging");
    }

    #[test]
    fn container_names_differ_for_distinct_namespace_workload_pairs() {
        assert_ne!(container_name("a", "web"), container_name("b", "web"));
    }

    #[test]
    fn strips_single_leading_slash_only() {
        assert_eq!(strip_leading_slash("/default-web"), "default-web");
        assert_eq!(strip_leading_slash("default-web"), "default-web");
    }
}
