//! In-memory backend: a `HashMap` guarded by one reader-writer
//! lock. Used in tests and for the system namespace bootstrap state that
//! need not survive a restart.

use std::collections::BTreeMap;
use std::collections::HashMap;

use async_trait::async_trait;
use k2d_util::error::{Error, Result};
use parking_lot::RwLock;

use crate::{Bind, LabelSelector, ObjectStore, StoredObject};

#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(type_marker: &str, namespace: &str, name: &str) -> String {
        format!("{type_marker}-{namespace}-{name}")
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, object: StoredObject) -> Result<()> {
        let key = Self::key(&object.type_marker, &object.namespace, &object.name);
        self.objects.write().insert(key, object);
        Ok(())
    }

    async fn get(&self, type_marker: &str, namespace: &str, name: &str) -> Result<StoredObject> {
        self.objects
            .read()
            .get(&Self::key(type_marker, namespace, name))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{type_marker} {namespace}/{name}")))
    }

    async fn list(&self, type_marker: &str, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>> {
        let prefix = format!("{type_marker}-{namespace}-");
        Ok(self
            .objects
            .read()
            .iter()
            .filter(|(key, object)| key.starts_with(&prefix) && selector.is_satisfied_by(&object.labels))
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn delete(&self, type_marker: &str, namespace: &str, name: &str) -> Result<()> {
        self.objects
            .write()
            .remove(&Self::key(type_marker, namespace, name))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("{type_marker} {namespace}/{name}")))
    }

    async fn binds(&self, _object: &StoredObject) -> Result<BTreeMap<String, Bind>> {
        Err(Error::Other(
            "the in-memory store backend does not support binds".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredObject {
        StoredObject {
            name: "cfg1".to_string(),
            namespace: "default".to_string(),
            type_marker: "configmap".to_string(),
            labels: BTreeMap::new(),
            created_at: chrono::Utc::now(),
            data: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        store.put(sample()).await.unwrap();
        assert!(store.get("configmap", "default", "cfg1").await.is_ok());
    }

    #[tokio::test]
    async fn binds_is_unsupported() {
        let store = MemoryStore::new();
        let object = sample();
        store.put(object.clone()).await.unwrap();
        assert!(store.binds(&object).await.is_err());
    }

    #[tokio::test]
    async fn delete_missing_object_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete("configmap", "default", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
