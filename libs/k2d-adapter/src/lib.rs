//! Sub-adapters translating Kubernetes-shaped requests into gateway and
//! store calls, one module per kind.

pub mod bootstrap;
pub mod configmap;
pub mod context;
pub mod event;
pub mod image_pull;
pub mod last_applied;
pub mod logs;
pub mod metrics;
pub mod namespace;
pub mod node;
pub mod persistentvolume;
pub mod persistentvolumeclaim;
pub mod pod;
pub mod refs;
pub mod registry_secret;
pub mod replace;
pub mod secret;
pub mod selfsubjectaccessreview;
pub mod service;
pub mod storageclass;
pub mod workload;

pub use context::{AdapterContext, ServiceAccountFiles};
