//! Shared, stateless-in-memory context every sub-adapter is built from.
//! All durable state lives in the engine or the auxiliary store, never
//! here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use k2d_gateway::Gateway;
use k2d_store::ObjectStore;

/// Paths mounted into every workload container as its service-account
/// credentials.
#[derive(Debug, Clone)]
pub struct ServiceAccountFiles {
    pub ca_cert_path: String,
    pub token_path: String,
}

#[derive(Clone)]
pub struct AdapterContext {
    pub gateway: Gateway,
    /// Backs ConfigMaps, Secrets and PVC-binding records.
    pub store: Arc<dyn ObjectStore>,
    /// Backs registry Secrets specifically; independently configurable
    /// from `store` (disk, volume or memory backend).
    pub registry_store: Arc<dyn ObjectStore>,
    pub advertise_ip: String,
    pub advertise_port: u16,
    pub service_account: Option<ServiceAccountFiles>,
    /// Process-wide start time, used for synthesized creation timestamps.
    /// Read-only after construction.
    pub start_time: DateTime<Utc>,
}

impl AdapterContext {
    pub fn cluster_service_host(&self) -> String {
        self.advertise_ip.clone()
    }

    pub fn cluster_service_port(&self) -> u16 {
        self.advertise_port
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
