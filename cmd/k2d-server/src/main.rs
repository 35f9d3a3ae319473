mod config;
mod telemetry;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, Router};
use clap::Parser;
use k2d_adapter::{AdapterContext, ServiceAccountFiles};
use k2d_gateway::Gateway;
use k2d_store::{FilesystemStore, MemoryStore, ObjectStore, VolumeStore, VolumeStoreConfig};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};

use config::{Args, RegistryStoreBackend, StoreBackend};

#[derive(Clone)]
struct ServerState {
    ctx: AdapterContext,
}

async fn healthz() -> impl IntoResponse {
    Json("healthy")
}

async fn metrics(State(state): State<ServerState>) -> impl IntoResponse {
    match state.ctx.gateway.ping().await {
        Ok(()) => (StatusCode::OK, "k2d_engine_reachable 1\n").into_response(),
        Err(e) => {
            tracing::error!("engine unreachable: {:?}", e);
            (StatusCode::OK, "k2d_engine_reachable 0\n").into_response()
        }
    }
}

fn build_store(data_path: &Path, backend: StoreBackend, gateway: &Gateway, helper_image: &str) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match backend {
        StoreBackend::Disk => Ok(Arc::new(FilesystemStore::new(data_path)?)),
        StoreBackend::Volume => {
            let key_path = data_path.join("volume-encryption.key");
            let key = k2d_store::crypto::load_or_generate_key(&key_path)?;
            let config = VolumeStoreConfig {
                helper_image: helper_image.to_string(),
                encryption_key: Some(key),
            };
            Ok(Arc::new(VolumeStore::new(gateway.clone(), config)))
        }
    }
}

fn build_registry_store(
    data_path: &Path,
    backend: RegistryStoreBackend,
    gateway: &Gateway,
    helper_image: &str,
) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match backend {
        RegistryStoreBackend::Disk => Ok(Arc::new(FilesystemStore::new(data_path.join("registry"))?)),
        RegistryStoreBackend::Volume => {
            let key_path = data_path.join("volume-encryption.key");
            let key = k2d_store::crypto::load_or_generate_key(&key_path)?;
            let config = VolumeStoreConfig {
                helper_image: helper_image.to_string(),
                encryption_key: Some(key),
            };
            Ok(Arc::new(VolumeStore::new(gateway.clone(), config)))
        }
        RegistryStoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    telemetry::init(
        &args.log_filter,
        args.log_format,
        args.tracing_url.as_deref(),
        args.sample_ratio,
    )
    .await?;

    let data_path = Path::new(&args.data_path);
    let gateway = Gateway::connect(Duration::from_secs(args.engine_timeout_seconds))?;

    let store = build_store(data_path, args.store_backend, &gateway, &args.volume_helper_image)?;
    let registry_store = build_registry_store(data_path, args.registry_store_backend, &gateway, &args.volume_helper_image)?;

    let service_account = match (&args.ca_cert_path, &args.token_path) {
        (Some(ca_cert_path), Some(token_path)) => Some(ServiceAccountFiles {
            ca_cert_path: ca_cert_path.clone(),
            token_path: token_path.clone(),
        }),
        _ => None,
    };

    let ctx = AdapterContext {
        gateway,
        store,
        registry_store,
        advertise_ip: args.advertise_ip.clone(),
        advertise_port: args.advertise_port,
        service_account,
        start_time: chrono::Utc::now(),
    };

    if args.reset {
        tracing::info!("running in reset mode, tearing down managed engine objects and store entries");
        k2d_adapter::bootstrap::reset(&ctx).await?;
        return Ok(());
    }

    k2d_adapter::bootstrap::bootstrap(&ctx).await?;

    let state = ServerState { ctx };
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", args.metrics_port)).await?;
    tracing::info!("listening on 0.0.0.0:{}", args.metrics_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM signal handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}
