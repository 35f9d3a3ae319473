//! Already-resolved ConfigMap/Secret data needed to materialize a pod
//! spec's environment and volume mounts.
//!
//! The engine-object converter is a pure function and must not reach into
//! the auxiliary object store itself. The resource adapter, which does
//! have store access, resolves every reference a pod spec names up front
//! and hands the converter this snapshot of injected store handles.

use std::collections::BTreeMap;

use super::model::BindTarget;

#[derive(Debug, Clone, Default)]
pub struct ResolvedRefs {
    /// (namespace, name) -> full ConfigMap data, for env-from and key-ref values.
    pub config_map_data: BTreeMap<(String, String), BTreeMap<String, String>>,
    /// (namespace, name) -> full Secret data, for env-from and key-ref values.
    pub secret_data: BTreeMap<(String, String), BTreeMap<String, String>>,
    /// (namespace, name) -> filename -> resolved mount target, from the store's `binds`.
    pub config_map_binds: BTreeMap<(String, String), BTreeMap<String, BindTarget>>,
    pub secret_binds: BTreeMap<(String, String), BTreeMap<String, BindTarget>>,
    /// PersistentVolumeClaim name -> backing engine volume name.
    pub pvc_volumes: BTreeMap<String, String>,
}

impl ResolvedRefs {
    pub fn config_map_value(&self, namespace: &str, name: &str, key: &str) -> Option<&str> {
        self.config_map_data
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|data| data.get(key))
            .map(String::as_str)
    }

    pub fn secret_value(&self, namespace: &str, name: &str, key: &str) -> Option<&str> {
        self.secret_data
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|data| data.get(key))
            .map(String::as_str)
    }

    pub fn config_map_all(&self, namespace: &str, name: &str) -> Vec<(String, String)> {
        self.config_map_data
            .get(&(namespace.to_string(), name.to_string()))
            .map(|data| data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn secret_all(&self, namespace: &str, name: &str) -> Vec<(String, String)> {
        self.secret_data
            .get(&(namespace.to_string(), name.to_string()))
            .map(|data| data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}
