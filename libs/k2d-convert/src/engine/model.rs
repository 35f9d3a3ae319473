//! Plain-data engine primitives the converter works against.
//!
//! Kept deliberately decoupled from the concrete engine client's wire types
//! (`bollard`'s, in this workspace's gateway) so the converter stays a pure
//! function of data: the gateway is responsible for mapping its client
//! library's responses into [`EngineContainer`]/[`EngineNetwork`]/
//! [`EngineVolume`]/[`EngineSystemInfo`] before handing them to this crate,
//! and for mapping a [`ContainerCreateSpec`] back into its client's create
//! parameters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl RuntimeState {
    pub fn is_running(&self) -> bool {
        matches!(self, RuntimeState::Running)
    }
}

/// A host port binding observed on (or requested for) a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPort {
    pub container_port: u16,
    pub protocol: Protocol,
    pub host_port: Option<u16>,
    pub host_ip: Option<String>,
}

impl PublishedPort {
    pub fn is_ipv6(&self) -> bool {
        self.host_ip
            .as_deref()
            .is_some_and(|ip| ip.contains(':'))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub network_name: String,
    pub ip_address: Option<String>,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EngineContainer {
    pub id: String,
    /// Leading `/` already stripped.
    pub name: String,
    pub image: String,
    pub state: RuntimeState,
    pub exit_code: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    pub published_ports: Vec<PublishedPort>,
    pub networks: Vec<NetworkEndpoint>,
}

impl EngineContainer {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct EngineNetwork {
    pub id: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct EngineVolume {
    pub name: String,
    pub mountpoint: String,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct EngineSystemInfo {
    pub node_name: String,
    pub architecture: String,
    pub os_type: String,
    pub kernel_version: String,
    pub ncpu: i64,
    pub mem_total_bytes: i64,
    pub engine_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    No,
}

impl RestartPolicy {
    pub fn as_engine_str(&self) -> &'static str {
        match self {
            RestartPolicy::Always => "always",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::No => "no",
        }
    }
}

#[derive(Debug, Clone)]
pub enum BindTarget {
    HostPath(String),
    Volume(String),
}

#[derive(Debug, Clone)]
pub struct Bind {
    pub target: BindTarget,
    pub mount_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct RequestedPort {
    pub container_port: u16,
    pub protocol: Protocol,
    pub host_port: Option<u16>,
}

/// Everything the gateway needs to create a workload container. Produced by
/// [`crate::engine::container::pod_spec_to_container`].
#[derive(Debug, Clone, Default)]
pub struct ContainerCreateSpec {
    pub image: String,
    pub labels: BTreeMap<String, String>,
    pub env: Vec<(String, String)>,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    pub restart_policy: Option<RestartPolicy>,
    pub user: Option<String>,
    pub privileged: bool,
    pub cpu_shares: Option<i64>,
    pub nano_cpus: Option<i64>,
    pub memory_bytes: Option<i64>,
    pub host_ports: Vec<RequestedPort>,
    pub binds: Vec<Bind>,
    pub network_name: String,
    pub network_aliases: Vec<String>,
}
