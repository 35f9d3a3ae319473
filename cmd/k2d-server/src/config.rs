use clap::{crate_authors, crate_description, crate_version, Parser, ValueEnum};

use crate::telemetry::LogFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Disk,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegistryStoreBackend {
    Disk,
    Volume,
    Memory,
}

#[derive(Parser, Debug)]
#[command(
    name = "k2d-server",
    about = crate_description!(),
    version = crate_version!(),
    author = crate_authors!("\n"),
)]
pub struct Args {
    /// Backend for ConfigMaps, Secrets and PVC-binding records.
    #[arg(long, value_enum, default_value_t = StoreBackend::Disk, env = "K2D_STORE_BACKEND")]
    pub store_backend: StoreBackend,

    /// Backend for dockerconfigjson registry Secrets, independently
    /// configurable from `store_backend`.
    #[arg(long, value_enum, default_value_t = RegistryStoreBackend::Disk, env = "K2D_REGISTRY_STORE_BACKEND")]
    pub registry_store_backend: RegistryStoreBackend,

    /// Root directory for the filesystem store backend.
    #[arg(long, default_value = "/var/lib/k2d", env = "K2D_DATA_PATH")]
    pub data_path: String,

    /// Image run as the short-lived helper container for the volume store
    /// backend's TAR data exchange.
    #[arg(long, default_value = "busybox:stable", env = "K2D_VOLUME_HELPER_IMAGE")]
    pub volume_helper_image: String,

    /// Timeout applied uniformly to every container engine call.
    #[arg(long, default_value_t = 30, env = "K2D_ENGINE_TIMEOUT_SECONDS")]
    pub engine_timeout_seconds: u64,

    /// IP address reported as the advertised cluster service host.
    #[arg(long, default_value = "127.0.0.1", env = "K2D_ADVERTISE_IP")]
    pub advertise_ip: String,

    /// Port reported as the advertised cluster service port.
    #[arg(long, default_value_t = 6443, env = "K2D_ADVERTISE_PORT")]
    pub advertise_port: u16,

    /// Path to the CA certificate mounted into workload containers as
    /// their service-account credential.
    #[arg(long, env = "K2D_CA_CERT_PATH")]
    pub ca_cert_path: Option<String>,

    /// Path to the bearer token file mounted into workload containers as
    /// their service-account credential.
    #[arg(long, env = "K2D_TOKEN_PATH")]
    pub token_path: Option<String>,

    /// Tear down every core-managed engine object and store entry, then
    /// exit instead of starting the server.
    #[arg(long, default_value_t = false, env = "K2D_RESET")]
    pub reset: bool,

    /// Listen on given port for `/healthz` and `/metrics`.
    #[arg(long, default_value_t = 8090, env = "K2D_METRICS_PORT")]
    pub metrics_port: u16,

    /// Set logging filter directive for `tracing_subscriber::filter::EnvFilter`.
    #[arg(long, default_value = "info", env = "K2D_LOG_FILTER")]
    pub log_filter: String,

    /// Set log format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "K2D_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// URL for the OpenTelemetry tracing endpoint. If not provided,
    /// tracing is recorded but not exported.
    #[arg(long, env = "OPENTELEMETRY_ENDPOINT_URL")]
    pub tracing_url: Option<String>,

    /// Sampling ratio for tracing.
    #[arg(long, default_value_t = 0.1, env)]
    pub sample_ratio: f64,
}
