//! Pod-spec ↔ container configuration, and Service ↔ container mutation:
//! pod spec to container create spec, container to pod, and service spec
//! to/from an applied container mutation.

use std::collections::{BTreeMap, BTreeSet};

use k2d_util::error::{Error, Result};
use k2d_util::naming;

use k8s_openapi::api::core::v1::{
    Container, ContainerState, ContainerStateRunning, ContainerStateTerminated,
    ContainerStateWaiting, ContainerStatus, Pod, PodSpec, PodStatus, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use rand::Rng;

use super::model::{
    Bind, BindTarget, ContainerCreateSpec, EngineContainer, Protocol, RequestedPort,
    RestartPolicy,
};
use super::quantity::{cpu_millis, memory_bytes, millis_to_cpu_shares, millis_to_nano_cpus};
use super::refs::ResolvedRefs;

pub const NODE_PORT_RANGE: std::ops::RangeInclusive<u16> = 30000..=32767;

#[derive(Debug, Clone)]
pub struct ServiceAccountMount {
    pub ca_cert_path: String,
    pub token_path: String,
}

#[derive(Debug, Clone)]
pub struct PodConversionContext<'a> {
    pub namespace: &'a str,
    pub network_name: String,
    pub cluster_service_host: String,
    pub cluster_service_port: u16,
    pub service_account: Option<ServiceAccountMount>,
}

/// Translate the first container of a pod spec into an engine container
/// creation spec. Only the first container is honored: k2d maps one
/// workload to exactly one container.
pub fn pod_spec_to_container(
    pod_spec: &PodSpec,
    refs: &ResolvedRefs,
    ctx: &PodConversionContext,
) -> Result<ContainerCreateSpec> {
    let container = pod_spec
        .containers
        .first()
        .ok_or_else(|| Error::validation("pod spec has no containers"))?;
    if pod_spec.containers.len() > 1 {
        tracing::warn!(
            count = pod_spec.containers.len(),
            "pod spec has more than one container; only the first is honored"
        );
    }

    let mut spec = ContainerCreateSpec {
        image: container
            .image
            .clone()
            .ok_or_else(|| Error::validation("container has no image"))?,
        network_name: ctx.network_name.clone(),
        ..Default::default()
    };

    spec.command = container.command.clone();
    spec.args = container.args.clone();

    spec.restart_policy = pod_spec.restart_policy.as_deref().map(|policy| match policy {
        "Always" => RestartPolicy::Always,
        "OnFailure" => RestartPolicy::OnFailure,
        _ => RestartPolicy::No,
    });

    if let Some(sc) = &container.security_context {
        spec.privileged = sc.privileged.unwrap_or(false);
        spec.user = sc.run_as_user.map(|uid| match sc.run_as_group {
            Some(gid) => format!("{uid}:{gid}"),
            None => uid.to_string(),
        });
    }

    apply_resources(container, &mut spec);
    apply_env(container, ctx.namespace, refs, &mut spec)?;
    apply_ports(container, &mut spec);
    apply_volume_mounts(pod_spec, container, ctx.namespace, refs, &mut spec)?;

    spec.env.push((
        "KUBERNETES_SERVICE_HOST".to_string(),
        ctx.cluster_service_host.clone(),
    ));
    spec.env.push((
        "KUBERNETES_SERVICE_PORT".to_string(),
        ctx.cluster_service_port.to_string(),
    ));
    if let Some(sa) = &ctx.service_account {
        spec.binds.push(Bind {
            target: BindTarget::HostPath(sa.ca_cert_path.clone()),
            mount_path: "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".to_string(),
            read_only: true,
        });
        spec.binds.push(Bind {
            target: BindTarget::HostPath(sa.token_path.clone()),
            mount_path: "/var/run/secrets/kubernetes.io/serviceaccount/token".to_string(),
            read_only: true,
        });
    }

    Ok(spec)
}

fn apply_resources(container: &Container, spec: &mut ContainerCreateSpec) {
    let Some(resources) = &container.resources else {
        return;
    };
    if let Some(requests) = &resources.requests {
        if let Some(cpu) = requests.get("cpu").and_then(|q| cpu_millis(&q.0)) {
            spec.cpu_shares = Some(millis_to_cpu_shares(cpu));
        }
    }
    if let Some(limits) = &resources.limits {
        if let Some(cpu) = limits.get("cpu").and_then(|q| cpu_millis(&q.0)) {
            spec.nano_cpus = Some(millis_to_nano_cpus(cpu));
        }
        if let Some(mem) = limits.get("memory").and_then(|q| memory_bytes(&q.0)) {
            spec.memory_bytes = Some(mem);
        }
    }
}

fn apply_env(
    container: &Container,
    namespace: &str,
    refs: &ResolvedRefs,
    spec: &mut ContainerCreateSpec,
) -> Result<()> {
    for from in container.env_from.iter().flatten() {
        let prefix = from.prefix.clone().unwrap_or_default();
        if let Some(cm) = &from.config_map_ref {
            let name = cm.name.clone();
            for (k, v) in refs.config_map_all(namespace, &name) {
                spec.env.push((format!("{prefix}{k}"), v));
            }
        }
        if let Some(secret) = &from.secret_ref {
            let name = secret.name.clone();
            for (k, v) in refs.secret_all(namespace, &name) {
                spec.env.push((format!("{prefix}{k}"), v));
            }
        }
    }

    for env in container.env.iter().flatten() {
        if let Some(value) = &env.value {
            spec.env.push((env.name.clone(), value.clone()));
            continue;
        }
        let Some(from) = &env.value_from else {
            continue;
        };
        if let Some(cm_ref) = &from.config_map_key_ref {
            let name = cm_ref.name.clone();
            match refs.config_map_value(namespace, &name, &cm_ref.key) {
                Some(value) => spec.env.push((env.name.clone(), value.to_string())),
                None if cm_ref.optional.unwrap_or(false) => {}
                None => {
                    return Err(Error::validation(format!(
                        "configMapKeyRef {name}/{} not found for env {}",
                        cm_ref.key, env.name
                    )));
                }
            }
        }
        if let Some(secret_ref) = &from.secret_key_ref {
            let name = secret_ref.name.clone();
            match refs.secret_value(namespace, &name, &secret_ref.key) {
                Some(value) => spec.env.push((env.name.clone(), value.to_string())),
                None if secret_ref.optional.unwrap_or(false) => {}
                None => {
                    return Err(Error::validation(format!(
                        "secretKeyRef {name}/{} not found for env {}",
                        secret_ref.key, env.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn apply_ports(container: &Container, spec: &mut ContainerCreateSpec) {
    for port in container.ports.iter().flatten() {
        let Some(host_port) = port.host_port else {
            continue;
        };
        spec.host_ports.push(RequestedPort {
            container_port: port.container_port as u16,
            protocol: match port.protocol.as_deref() {
                Some("UDP") => Protocol::Udp,
                _ => Protocol::Tcp,
            },
            host_port: Some(host_port as u16),
        });
    }
}

fn apply_volume_mounts(
    pod_spec: &PodSpec,
    container: &Container,
    namespace: &str,
    refs: &ResolvedRefs,
    spec: &mut ContainerCreateSpec,
) -> Result<()> {
    let volumes: BTreeMap<&str, _> = pod_spec
        .volumes
        .iter()
        .flatten()
        .map(|v| (v.name.as_str(), v))
        .collect();

    for mount in container.volume_mounts.iter().flatten() {
        let volume = volumes
            .get(mount.name.as_str())
            .ok_or_else(|| Error::validation(format!("volume {} not declared", mount.name)))?;
        let read_only = mount.read_only.unwrap_or(false);

        if let Some(cm) = &volume.config_map {
            let name = cm.name.clone();
            let binds = refs
                .config_map_binds
                .get(&(namespace.to_string(), name.clone()))
                .ok_or_else(|| Error::not_found(format!("configmap {namespace}/{name}")))?;
            for (file, target) in binds {
                spec.binds.push(Bind {
                    target: target.clone(),
                    mount_path: format!("{}/{}", mount.mount_path, file),
                    read_only: true,
                });
            }
        } else if let Some(secret) = &volume.secret {
            let name = secret.secret_name.clone().unwrap_or_default();
            let binds = refs
                .secret_binds
                .get(&(namespace.to_string(), name.clone()))
                .ok_or_else(|| Error::not_found(format!("secret {namespace}/{name}")))?;
            for (file, target) in binds {
                spec.binds.push(Bind {
                    target: target.clone(),
                    mount_path: format!("{}/{}", mount.mount_path, file),
                    read_only: true,
                });
            }
        } else if let Some(host_path) = &volume.host_path {
            spec.binds.push(Bind {
                target: BindTarget::HostPath(host_path.path.clone()),
                mount_path: mount.mount_path.clone(),
                read_only,
            });
        } else if let Some(pvc) = &volume.persistent_volume_claim {
            let volume_name = refs
                .pvc_volumes
                .get(&pvc.claim_name)
                .ok_or_else(|| Error::not_found(format!("persistentvolumeclaim {}", pvc.claim_name)))?;
            spec.binds.push(Bind {
                target: BindTarget::Volume(volume_name.clone()),
                mount_path: mount.mount_path.clone(),
                read_only: pvc.read_only.unwrap_or(read_only),
            });
        }
    }
    Ok(())
}

/// Mutate a container spec to express a Service selecting it. Returns the
/// node ports drawn for
/// `NodePort` services so the caller can log/report them; `ClusterIP` and
/// headless/`ExternalName` services make no container mutation beyond the
/// network alias set, which the adapter applies regardless of type via
/// `naming::service_alias_set`.
pub fn apply_service_to_container(
    service_name: &str,
    namespace: &str,
    service_spec: &ServiceSpec,
    ports_in_use: &BTreeSet<u16>,
    container: &mut ContainerCreateSpec,
) -> Result<Vec<(u16, u16)>> {
    let service_type = service_spec.type_.as_deref().unwrap_or("ClusterIP");
    if matches!(service_type, "ExternalName") {
        return Ok(Vec::new());
    }
    if service_spec.cluster_ip.as_deref() == Some("None") {
        // Headless: no container mutation, no node ports.
        return Ok(Vec::new());
    }

    container.network_aliases = naming::service_alias_set(service_name, namespace).to_vec();

    if service_type != "NodePort" {
        return Ok(Vec::new());
    }

    let mut used = ports_in_use.clone();
    let mut allocations = Vec::new();
    for port in service_spec.ports.iter().flatten() {
        let target_port = resolve_target_port(port)?;
        let node_port = match port.node_port {
            Some(np) => np as u16,
            None => allocate_node_port(&used)?,
        };
        used.insert(node_port);
        allocations.push((target_port, node_port));
        container.host_ports.push(RequestedPort {
            container_port: target_port,
            protocol: match port.protocol.as_deref() {
                Some("UDP") => Protocol::Udp,
                _ => Protocol::Tcp,
            },
            host_port: Some(node_port),
        });
    }
    Ok(allocations)
}

fn resolve_target_port(port: &ServicePort) -> Result<u16> {
    match &port.target_port {
        Some(IntOrString::Int(p)) => Ok(*p as u16),
        Some(IntOrString::String(_)) => {
            // Named target ports resolve against the container's declared
            // ports; callers that need this should pre-resolve the name
            // before calling. Falling back to the service port itself keeps
            // behavior defined rather than failing the whole mutation.
            Ok(port.port as u16)
        }
        None => Ok(port.port as u16),
    }
}

fn allocate_node_port(used: &BTreeSet<u16>) -> Result<u16> {
    let mut rng = rand::thread_rng();
    for _ in 0..64 {
        let candidate = rng.gen_range(NODE_PORT_RANGE);
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::Engine(
        "no free node port found in [30000, 32767]".to_string(),
    ))
}

/// Reconstruct a Pod from an engine container.
pub fn container_to_pod(container: &EngineContainer, namespace: &str) -> Result<Pod> {
    let spec = match container.label(naming::LABEL_POD_LAST_APPLIED) {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| Error::Serialization("decoding pod last-applied".into(), e))?,
        None => PodSpec {
            containers: vec![Container {
                name: container.name.clone(),
                image: Some(container.image.clone()),
                ..Default::default()
            }],
            ..Default::default()
        },
    };

    let phase = if container.state.is_running() {
        "Running"
    } else {
        "Unknown"
    };

    let state = container_state(container);
    let status = ContainerStatus {
        name: container.name.clone(),
        image: container.image.clone(),
        image_id: String::new(),
        container_id: Some(container.id.clone()),
        ready: container.state.is_running(),
        started: Some(container.state.is_running()),
        restart_count: 0,
        state: Some(state.clone()),
        last_state: Some(state),
        ..Default::default()
    };

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(container.name.clone()),
            namespace: Some(namespace.to_string()),
            creation_timestamp: container.created_at.map(|t| {
                super::time::to_k8s_time(t)
            }),
            ..Default::default()
        },
        spec: Some(spec),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(vec![status]),
            ..Default::default()
        }),
    })
}

fn container_state(container: &EngineContainer) -> ContainerState {
    if container.state.is_running() {
        ContainerState {
            running: Some(ContainerStateRunning {
                started_at: container.started_at.map(|t| {
                    super::time::to_k8s_time(t)
                }),
            }),
            ..Default::default()
        }
    } else if matches!(
        container.state,
        super::model::RuntimeState::Exited | super::model::RuntimeState::Dead
    ) {
        ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code: container.exit_code.unwrap_or(0) as i32,
                started_at: container.started_at.map(|t| {
                    super::time::to_k8s_time(t)
                }),
                finished_at: container.finished_at.map(|t| {
                    super::time::to_k8s_time(t)
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    } else {
        ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(format!("{:?}", container.state)),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Reconstruct a Service from the container it is expressed on. Returns
/// `None` when the container carries no
/// service last-applied configuration.
pub fn container_to_service(
    container: &EngineContainer,
    namespace: &str,
    advertise_ip: &str,
) -> Result<Option<Service>> {
    let Some(json) = container.label(naming::LABEL_SERVICE_LAST_APPLIED) else {
        return Ok(None);
    };
    let mut service: Service = serde_json::from_str(json)
        .map_err(|e| Error::Serialization("decoding service last-applied".into(), e))?;

    let cluster_ip = container
        .networks
        .iter()
        .find(|n| n.network_name == naming::network_name(namespace))
        .and_then(|n| n.ip_address.clone());

    if let Some(spec) = &mut service.spec {
        spec.cluster_ip = cluster_ip.or(spec.cluster_ip.clone());
        if spec.type_.as_deref() == Some("NodePort") {
            for port in spec.ports.iter_mut().flatten() {
                let target = resolve_target_port(port).unwrap_or(port.port as u16);
                if let Some(published) = container
                    .published_ports
                    .iter()
                    .find(|p| p.container_port == target && !p.is_ipv6())
                {
                    port.node_port = published.host_port.map(|p| p as i32);
                }
            }
            spec.external_ips = Some(vec![advertise_ip.to_string()]);
        }
    }

    Ok(Some(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ConfigMapEnvSource, ConfigMapKeySelector, EnvFromSource, EnvVar, EnvVarSource,
        ResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    fn base_ctx() -> PodConversionContext<'static> {
        PodConversionContext {
            namespace: "default",
            network_name: "default".to_string(),
            cluster_service_host: "127.0.0.1".to_string(),
            cluster_service_port: 6443,
            service_account: None,
        }
    }

    fn pod_spec_with(container: Container) -> PodSpec {
        PodSpec {
            containers: vec![container],
            ..Default::default()
        }
    }

    #[test]
    fn rejects_pod_spec_with_no_containers() {
        let pod_spec = PodSpec::default();
        let refs = ResolvedRefs::default();
        let err = pod_spec_to_container(&pod_spec, &refs, &base_ctx()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_container_with_no_image() {
        let pod_spec = pod_spec_with(Container {
            name: "web".to_string(),
            ..Default::default()
        });
        let refs = ResolvedRefs::default();
        assert!(pod_spec_to_container(&pod_spec, &refs, &base_ctx()).is_err());
    }

    #[test]
    fn env_from_config_map_and_direct_value_both_land_in_spec() {
        let pod_spec = pod_spec_with(Container {
            name: "web".to_string(),
            image: Some("nginx:1.25".to_string()),
            env_from: Some(vec![EnvFromSource {
                config_map_ref: Some(ConfigMapEnvSource {
                    name: Some("app".to_string()),
                    optional: None,
                }),
                ..Default::default()
            }]),
            env: Some(vec![EnvVar {
                name: "DIRECT".to_string(),
                value: Some("set".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let mut refs = ResolvedRefs::default();
        refs.config_map_data.insert(
            ("default".to_string(), "app".to_string()),
            BTreeMap::from([("A".to_string(), "1".to_string())]),
        );

        let spec = pod_spec_to_container(&pod_spec, &refs, &base_ctx()).unwrap();
        assert!(spec.env.contains(&("A".to_string(), "1".to_string())));
        assert!(spec.env.contains(&("DIRECT".to_string(), "set".to_string())));
    }

    #[test]
    fn missing_required_config_map_key_ref_is_an_error() {
        let pod_spec = pod_spec_with(Container {
            name: "web".to_string(),
            image: Some("nginx:1.25".to_string()),
            env: Some(vec![EnvVar {
                name: "MISSING".to_string(),
                value_from: Some(EnvVarSource {
                    config_map_key_ref: Some(ConfigMapKeySelector {
                        name: Some("app".to_string()),
                        key: "nope".to_string(),
                        optional: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let refs = ResolvedRefs::default();
        assert!(pod_spec_to_container(&pod_spec, &refs, &base_ctx()).is_err());
    }

    #[test]
    fn optional_missing_key_ref_is_silently_skipped() {
        let pod_spec = pod_spec_with(Container {
            name: "web".to_string(),
            image: Some("nginx:1.25".to_string()),
            env: Some(vec![EnvVar {
                name: "MAYBE".to_string(),
                value_from: Some(EnvVarSource {
                    config_map_key_ref: Some(ConfigMapKeySelector {
                        name: Some("app".to_string()),
                        key: "nope".to_string(),
                        optional: Some(true),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let refs = ResolvedRefs::default();
        let spec = pod_spec_to_container(&pod_spec, &refs, &base_ctx()).unwrap();
        assert!(spec.env.iter().all(|(k, _)| k != "MAYBE"));
    }

    #[test]
    fn resource_limits_convert_to_nano_cpus_and_memory_bytes() {
        let container = Container {
            name: "web".to_string(),
            image: Some("nginx:1.25".to_string()),
            resources: Some(ResourceRequirements {
                limits: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity("500m".to_string())),
                    ("memory".to_string(), Quantity("128Mi".to_string())),
                ])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut spec = ContainerCreateSpec::default();
        apply_resources(&container, &mut spec);
        assert_eq!(spec.nano_cpus, Some(500_000_000));
        assert_eq!(spec.memory_bytes, Some(128 * 1024 * 1024));
    }

    #[test]
    fn cluster_service_env_vars_always_present() {
        let pod_spec = pod_spec_with(Container {
            name: "web".to_string(),
            image: Some("nginx:1.25".to_string()),
            ..Default::default()
        });
        let refs = ResolvedRefs::default();
        let spec = pod_spec_to_container(&pod_spec, &refs, &base_ctx()).unwrap();
        assert!(spec.env.contains(&("KUBERNETES_SERVICE_HOST".to_string(), "127.0.0.1".to_string())));
        assert!(spec.env.contains(&("KUBERNETES_SERVICE_PORT".to_string(), "6443".to_string())));
    }

    #[test]
    fn node_port_service_draws_a_port_in_range_and_avoids_in_use() {
        let mut container = ContainerCreateSpec::default();
        let service_spec = ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(vec![ServicePort {
                port: 8080,
                target_port: Some(IntOrString::Int(8080)),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let used: BTreeSet<u16> = BTreeSet::from([30000, 30001, 30002]);
        let allocations = apply_service_to_container("api", "default", &service_spec, &used, &mut container).unwrap();
        assert_eq!(allocations.len(), 1);
        let (target, node_port) = allocations[0];
        assert_eq!(target, 8080);
        assert!(NODE_PORT_RANGE.contains(&node_port));
        assert!(!used.contains(&node_port));
    }

    #[test]
    fn explicit_node_port_is_honored_without_allocation() {
        let mut container = ContainerCreateSpec::default();
        let service_spec = ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(vec![ServicePort {
                port: 8080,
                target_port: Some(IntOrString::Int(8080)),
                node_port: Some(30500),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let allocations =
            apply_service_to_container("api", "default", &service_spec, &BTreeSet::new(), &mut container).unwrap();
        assert_eq!(allocations[0], (8080, 30500));
    }

    #[test]
    fn external_name_service_makes_no_container_mutation() {
        let mut container = ContainerCreateSpec::default();
        let service_spec = ServiceSpec {
            type_: Some("ExternalName".to_string()),
            ..Default::default()
        };
        let allocations =
            apply_service_to_container("api", "default", &service_spec, &BTreeSet::new(), &mut container).unwrap();
        assert!(allocations.is_empty());
        assert!(container.network_aliases.is_empty());
    }
}
