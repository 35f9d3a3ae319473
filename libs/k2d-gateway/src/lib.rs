//! Typed wrapper over the container engine API.
//!
//! Nothing in this crate inspects Kubernetes objects or touches the object
//! store; it only knows how to list/inspect/create/start/stop/remove
//! containers, networks, volumes and images, and to report engine system
//! info. Kubernetes semantics live in `k2d-adapter`, which composes this
//! gateway with `k2d-convert` and `k2d-store`.

mod client;
mod container;
mod error;
mod image;
mod network;
mod system;
mod volume;

pub use client::Gateway;
pub use container::requested_port_key;
pub use error::map_engine_error;
pub use image::RegistryAuth;
