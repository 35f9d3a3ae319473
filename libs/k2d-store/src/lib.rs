//! Auxiliary object store: a namespace-scoped key/value+labels store
//! behind one of three backends. Used by `k2d-adapter` for ConfigMaps,
//! Secrets, registry Secrets and PersistentVolumeClaim binding records — any
//! Kubernetes kind that has no natural container/network/volume analogue.

mod filesystem;
mod memory;
mod volume;

pub mod crypto;

use std::collections::BTreeMap;

use async_trait::async_trait;
use k2d_util::error::Result;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use volume::{VolumeStore, VolumeStoreConfig};

/// A value recognized by a store backend: opaque bytes per key, labels and a
/// creation timestamp. The `type_marker` distinguishes the kind of object
/// this entry represents (`configmap`, `secret`, `registry-secret`,
/// `pvc-binding`) so the filesystem backend can name its metadata file and
/// so `list` can be scoped to one kind.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub name: String,
    pub namespace: String,
    pub type_marker: String,
    pub labels: BTreeMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl StoredObject {
    pub fn key(&self) -> String {
        format!("{}-{}", self.namespace, self.name)
    }
}

/// A label selector evaluated client-side after a backend loads its full
/// listing.
#[derive(Debug, Clone, Default)]
pub struct LabelSelector {
    pub matches: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.matches.insert(key.into(), value.into());
        self
    }

    pub fn is_satisfied_by(&self, labels: &BTreeMap<String, String>) -> bool {
        self.matches
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// How a `get`/`list`/`delete` caller wants a bound volume's data exposed
/// in a container: either a host path or the name of an engine volume.
#[derive(Debug, Clone)]
pub enum Bind {
    HostPath(String),
    Volume(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, object: StoredObject) -> Result<()>;
    async fn get(&self, type_marker: &str, namespace: &str, name: &str) -> Result<StoredObject>;
    async fn list(&self, type_marker: &str, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>>;
    async fn delete(&self, type_marker: &str, namespace: &str, name: &str) -> Result<()>;

    /// Per data key, where that key's bytes can be found for a container
    /// mount. Not every backend supports this: the in-memory backend
    /// always returns an error.
    async fn binds(&self, object: &StoredObject) -> Result<BTreeMap<String, Bind>>;
}
