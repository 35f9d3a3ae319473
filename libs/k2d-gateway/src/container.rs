use k2d_util::error::{Error, Result};
use k2d_util::naming;

use std::collections::HashMap;

use bollard::container::{
    Config, CreateContainerOptions, DownloadFromContainerOptions, ListContainersOptions,
    LogsOptions, RemoveContainerOptions, RenameContainerOptions, StartContainerOptions, Stats,
    StatsOptions, StopContainerOptions, UploadToContainerOptions,
};
use bytes::Bytes;
use bollard::models::{
    ContainerInspectResponse, ContainerSummary, EndpointSettings, HostConfig, Mount, MountTypeEnum,
    NetworkingConfig, PortBinding, PortMap, RestartPolicy as EngineRestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::query_parameters::InspectContainerOptionsBuilder;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use k2d_convert::engine::model::{
    BindTarget, ContainerCreateSpec, EngineContainer, NetworkEndpoint, Protocol, PublishedPort,
    RequestedPort, RestartPolicy, RuntimeState,
};
use tokio_util::sync::CancellationToken;

use crate::error::map_engine_error;
use crate::Gateway;

impl Gateway {
    pub async fn list_containers(&self, label_filter: Option<(&str, &str)>) -> Result<Vec<EngineContainer>> {
        let mut filters = HashMap::new();
        if let Some((key, value)) = label_filter {
            filters.insert("label".to_string(), vec![format!("{key}={value}")]);
        }
        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| map_engine_error("listing containers", e))?;
        summaries.iter().map(summary_to_engine_container).collect()
    }

    pub async fn inspect_container(&self, name: &str) -> Result<EngineContainer> {
        let response = self
            .docker
            .inspect_container(name, None::<InspectContainerOptionsBuilder>)
            .await
            .map_err(|e| map_engine_error(&format!("inspecting container {name}"), e))?;
        inspect_to_engine_container(&response)
    }

    pub async fn create_container(&self, name: &str, spec: &ContainerCreateSpec) -> Result<String> {
        let config = to_engine_config(spec);
        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.to_string(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(|e| map_engine_error(&format!("creating container {name}"), e))?;
        Ok(response.id)
    }

    pub async fn start_container(&self, name: &str) -> Result<()> {
        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_engine_error(&format!("starting container {name}"), e))
    }

    pub async fn stop_container(&self, name: &str) -> Result<()> {
        self.docker
            .stop_container(name, None::<StopContainerOptions>)
            .await
            .map_err(|e| map_engine_error(&format!("stopping container {name}"), e))
    }

    pub async fn remove_container(&self, name: &str, force: bool) -> Result<()> {
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| map_engine_error(&format!("removing container {name}"), e))
    }

    pub async fn rename_container(&self, name: &str, new_name: &str) -> Result<()> {
        self.docker
            .rename_container(
                name,
                RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await
            .map_err(|e| map_engine_error(&format!("renaming container {name}"), e))
    }

    /// Stream container logs, stopping early when `cancel` fires so a long
    /// tail follow doesn't outlive the caller's request.
    pub async fn logs(
        &self,
        name: &str,
        timestamps: bool,
        follow: bool,
        tail: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<String>> + '_> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps,
            follow,
            tail: tail.unwrap_or("all").to_string(),
            ..Default::default()
        };
        let stream = self.docker.logs(name, Some(options));
        Ok(stream.take_until(cancel.cancelled_owned()).map(|chunk| {
            chunk
                .map(|log| log.to_string())
                .map_err(|e| map_engine_error("streaming logs", e))
        }))
    }

    /// Writes a TAR archive into `path` inside the named container, used by
    /// the volume store backend to exchange data with a helper container.
    pub async fn upload_to_container(&self, name: &str, path: &str, tar: Vec<u8>) -> Result<()> {
        self.docker
            .upload_to_container(
                name,
                Some(UploadToContainerOptions {
                    path: path.to_string(),
                    ..Default::default()
                }),
                Bytes::from(tar).into(),
            )
            .await
            .map_err(|e| map_engine_error(&format!("uploading archive to {name}"), e))
    }

    /// Reads `path` out of the named container as a TAR archive.
    pub async fn download_from_container(&self, name: &str, path: &str) -> Result<Vec<u8>> {
        let mut stream = self.docker.download_from_container(
            name,
            Some(DownloadFromContainerOptions {
                path: path.to_string(),
            }),
        );
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.map_err(|e| map_engine_error(&format!("downloading archive from {name}"), e))?);
        }
        Ok(bytes)
    }

    /// A single stats snapshot, not a stream.
    pub async fn stats(&self, name: &str) -> Result<Stats> {
        let mut stream = self.docker.stats(
            name,
            Some(StatsOptions {
                stream: false,
                ..Default::default()
            }),
        );
        stream
            .next()
            .await
            .ok_or_else(|| Error::Engine(format!("no stats returned for {name}")))?
            .map_err(|e| map_engine_error(&format!("reading stats for {name}"), e))
    }
}

fn to_engine_config(spec: &ContainerCreateSpec) -> Config<String> {
    let mut exposed_ports = HashMap::new();
    let mut port_bindings: PortMap = HashMap::new();
    for port in &spec.host_ports {
        let key = format!("{}/{}", port.container_port, port.protocol.as_str());
        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings.insert(
            key,
            Some(vec![PortBinding {
                host_ip: None,
                host_port: port.host_port.map(|p| p.to_string()),
            }]),
        );
    }

    let mut mounts = Vec::new();
    for bind in &spec.binds {
        let (source, typ) = match &bind.target {
            BindTarget::HostPath(path) => (path.clone(), MountTypeEnum::BIND),
            BindTarget::Volume(name) => (name.clone(), MountTypeEnum::VOLUME),
        };
        mounts.push(Mount {
            source: Some(source),
            target: Some(bind.mount_path.clone()),
            typ: Some(typ),
            read_only: Some(bind.read_only),
            ..Default::default()
        });
    }

    let restart_policy = spec.restart_policy.map(|policy| EngineRestartPolicy {
        name: Some(match policy {
            RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
            RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
            RestartPolicy::No => RestartPolicyNameEnum::EMPTY,
        }),
        maximum_retry_count: None,
    });

    let host_config = HostConfig {
        privileged: Some(spec.privileged),
        cpu_shares: spec.cpu_shares,
        nano_cpus: spec.nano_cpus,
        memory: spec.memory_bytes,
        port_bindings: Some(port_bindings),
        mounts: Some(mounts),
        restart_policy,
        network_mode: Some(spec.network_name.clone()),
        ..Default::default()
    };

    let networking_config = NetworkingConfig {
        endpoints_config: HashMap::from([(
            spec.network_name.clone(),
            EndpointSettings {
                aliases: Some(spec.network_aliases.clone()),
                ..Default::default()
            },
        )]),
    };

    Config {
        image: Some(spec.image.clone()),
        labels: Some(spec.labels.clone().into_iter().collect()),
        env: Some(
            spec.env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect(),
        ),
        entrypoint: spec.command.clone(),
        cmd: spec.args.clone(),
        user: spec.user.clone(),
        exposed_ports: Some(exposed_ports),
        host_config: Some(host_config),
        networking_config: Some(networking_config),
        ..Default::default()
    }
}

fn runtime_state(state: Option<&str>) -> RuntimeState {
    match state {
        Some("created") => RuntimeState::Created,
        Some("running") => RuntimeState::Running,
        Some("paused") => RuntimeState::Paused,
        Some("restarting") => RuntimeState::Restarting,
        Some("removing") => RuntimeState::Removing,
        Some("exited") => RuntimeState::Exited,
        Some("dead") => RuntimeState::Dead,
        _ => RuntimeState::Unknown,
    }
}

fn summary_to_engine_container(summary: &ContainerSummary) -> Result<EngineContainer> {
    let name = summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|n| naming::strip_leading_slash(n).to_string())
        .unwrap_or_default();

    let mut published_ports = Vec::new();
    for port in summary.ports.iter().flatten() {
        published_ports.push(PublishedPort {
            container_port: port.private_port,
            protocol: match port.typ {
                Some(bollard::models::PortTypeEnum::UDP) => Protocol::Udp,
                _ => Protocol::Tcp,
            },
            host_port: port.public_port,
            host_ip: port.ip.clone(),
        });
    }

    let mut networks = Vec::new();
    if let Some(settings) = &summary.network_settings {
        for (name, endpoint) in settings.networks.iter().flatten() {
            networks.push(NetworkEndpoint {
                network_name: name.clone(),
                ip_address: endpoint.ip_address.clone().filter(|s| !s.is_empty()),
                aliases: endpoint.aliases.clone().unwrap_or_default(),
            });
        }
    }

    Ok(EngineContainer {
        id: summary.id.clone().unwrap_or_default(),
        name,
        image: summary.image.clone().unwrap_or_default(),
        state: runtime_state(summary.state.as_deref()),
        exit_code: None,
        created_at: summary
            .created
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        started_at: None,
        finished_at: None,
        labels: summary.labels.clone().unwrap_or_default().into_iter().collect(),
        published_ports,
        networks,
    })
}

fn inspect_to_engine_container(response: &ContainerInspectResponse) -> Result<EngineContainer> {
    let name = response
        .name
        .as_deref()
        .map(|n| naming::strip_leading_slash(n).to_string())
        .unwrap_or_default();

    let state = response.state.as_ref();
    let runtime = runtime_state(state.and_then(|s| s.status.as_ref()).map(|s| s.as_ref()));
    let exit_code = state.and_then(|s| s.exit_code);
    let started_at = state
        .and_then(|s| s.started_at.as_deref())
        .and_then(k2d_util::time::parse_rfc3339);
    let finished_at = state
        .and_then(|s| s.finished_at.as_deref())
        .and_then(k2d_util::time::parse_rfc3339);
    let created_at = response
        .created
        .as_deref()
        .and_then(k2d_util::time::parse_rfc3339);

    let labels = response
        .config
        .as_ref()
        .and_then(|c| c.labels.clone())
        .unwrap_or_default()
        .into_iter()
        .collect();

    let image = response
        .config
        .as_ref()
        .and_then(|c| c.image.clone())
        .unwrap_or_default();

    let mut networks = Vec::new();
    if let Some(settings) = &response.network_settings {
        for (name, endpoint) in settings.networks.iter().flatten() {
            networks.push(NetworkEndpoint {
                network_name: name.clone(),
                ip_address: endpoint.ip_address.clone().filter(|s| !s.is_empty()),
                aliases: endpoint.aliases.clone().unwrap_or_default(),
            });
        }
    }

    let mut published_ports = Vec::new();
    if let Some(settings) = &response.network_settings {
        for (key, bindings) in settings.ports.clone().unwrap_or_default() {
            let mut parts = key.split('/');
            let container_port: u16 = parts.next().and_then(|p| p.parse().ok()).unwrap_or_default();
            let protocol = match parts.next() {
                Some("udp") => Protocol::Udp,
                _ => Protocol::Tcp,
            };
            for binding in bindings.unwrap_or_default() {
                published_ports.push(PublishedPort {
                    container_port,
                    protocol,
                    host_port: binding.host_port.and_then(|p| p.parse().ok()),
                    host_ip: binding.host_ip,
                });
            }
        }
    }

    Ok(EngineContainer {
        id: response.id.clone().unwrap_or_default(),
        name,
        image,
        state: runtime,
        exit_code,
        created_at,
        started_at,
        finished_at,
        labels,
        published_ports,
        networks,
    })
}

pub fn requested_port_key(port: &RequestedPort) -> String {
    format!("{}/{}", port.container_port, port.protocol.as_str())
}
