//! Filesystem backend: one file per data key under a per-kind
//! subdirectory, one metadata file per object, guarded by a single
//! per-store reader-writer lock.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use k2d_util::error::{Error, Result};
use k2d_util::naming::LABEL_NAMESPACE_NAME;
use parking_lot::RwLock;

use crate::{Bind, LabelSelector, ObjectStore, StoredObject};

const CREATED_AT_LABEL: &str = "store.k2d.io/filesystem/creation-timestamp";

/// Maps a store's generic type marker to the on-disk subdirectory name and
/// the short marker spliced into every file name for that kind:
/// `{namespace}-{name}-k2dcm-{key}` for ConfigMaps, `-k2dsec-` for Secrets.
fn layout(type_marker: &str) -> (&'static str, &'static str) {
    match type_marker {
        "configmap" => ("configmaps", "k2dcm"),
        "secret" => ("secrets", "k2dsec"),
        "registry-secret" => ("registry-secrets", "k2drsec"),
        "pvc-binding" => ("pvc-bindings", "k2dpvc"),
        _ => ("objects", "k2dobj"),
    }
}

pub struct FilesystemStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::Store(format!("creating store root: {e}")))?;
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    fn kind_dir(&self, type_marker: &str) -> Result<PathBuf> {
        let (subdir, _) = layout(type_marker);
        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).map_err(|e| Error::Store(format!("creating {}: {e}", dir.display())))?;
        Ok(dir)
    }

    fn metadata_path(&self, type_marker: &str, namespace: &str, name: &str) -> Result<PathBuf> {
        let (_, marker) = layout(type_marker);
        Ok(self
            .kind_dir(type_marker)?
            .join(format!("{namespace}-{name}-{marker}.metadata")))
    }

    fn data_path(&self, type_marker: &str, namespace: &str, name: &str, key: &str) -> Result<PathBuf> {
        let (_, marker) = layout(type_marker);
        Ok(self
            .kind_dir(type_marker)?
            .join(format!("{namespace}-{name}-{marker}-{key}")))
    }

    fn write_metadata(&self, object: &StoredObject) -> Result<()> {
        let mut lines = String::new();
        lines.push_str(&format!(
            "{CREATED_AT_LABEL}={}\n",
            k2d_util::time::format_rfc3339(object.created_at)
        ));
        lines.push_str(&format!("{LABEL_NAMESPACE_NAME}={}\n", object.namespace));
        for (key, value) in &object.labels {
            lines.push_str(&format!("{key}={value}\n"));
        }
        let path = self.metadata_path(&object.type_marker, &object.namespace, &object.name)?;
        fs::write(&path, lines).map_err(|e| Error::Store(format!("writing {}: {e}", path.display())))
    }

    fn read_metadata(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Store(format!("reading {}: {e}", path.display())))?;
        Ok(contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
    }

    fn parse_object(
        &self,
        type_marker: &str,
        namespace: &str,
        name: &str,
        metadata_path: &Path,
    ) -> Result<StoredObject> {
        let mut fields = self.read_metadata(metadata_path)?;
        let created_at = fields
            .remove(CREATED_AT_LABEL)
            .and_then(|s| k2d_util::time::parse_rfc3339(&s))
            .unwrap_or_else(chrono::Utc::now);
        fields.remove(LABEL_NAMESPACE_NAME);

        let (_, marker) = layout(type_marker);
        let prefix = format!("{namespace}-{name}-{marker}-");
        let suffix = format!("-{marker}.metadata");
        let mut data = BTreeMap::new();
        for entry in fs::read_dir(self.kind_dir(type_marker)?)
            .map_err(|e| Error::Store(format!("reading store directory: {e}")))?
        {
            let entry = entry.map_err(|e| Error::Store(format!("reading store directory: {e}")))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(&prefix) && !file_name.ends_with(&suffix) {
                let key = file_name.strip_prefix(&prefix).unwrap().to_string();
                let bytes = fs::read(entry.path())
                    .map_err(|e| Error::Store(format!("reading {}: {e}", entry.path().display())))?;
                data.insert(key, bytes);
            }
        }

        Ok(StoredObject {
            name: name.to_string(),
            namespace: namespace.to_string(),
            type_marker: type_marker.to_string(),
            labels: fields,
            created_at,
            data,
        })
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(&self, object: StoredObject) -> Result<()> {
        let _guard = self.lock.write();
        for (key, bytes) in &object.data {
            let path = self.data_path(&object.type_marker, &object.namespace, &object.name, key)?;
            fs::write(&path, bytes)
                .map_err(|e| Error::Store(format!("writing {}: {e}", path.display())))?;
        }
        self.write_metadata(&object)
    }

    async fn get(&self, type_marker: &str, namespace: &str, name: &str) -> Result<StoredObject> {
        let _guard = self.lock.read();
        let metadata_path = self.metadata_path(type_marker, namespace, name)?;
        if !metadata_path.exists() {
            return Err(Error::not_found(format!("{type_marker} {namespace}/{name}")));
        }
        self.parse_object(type_marker, namespace, name, &metadata_path)
    }

    async fn list(&self, type_marker: &str, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>> {
        let _guard = self.lock.read();
        let (_, marker) = layout(type_marker);
        let suffix = format!("-{marker}.metadata");
        let prefix = format!("{namespace}-");
        let mut out = Vec::new();
        for entry in fs::read_dir(self.kind_dir(type_marker)?)
            .map_err(|e| Error::Store(format!("reading store directory: {e}")))?
        {
            let entry = entry.map_err(|e| Error::Store(format!("reading store directory: {e}")))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if !file_name.starts_with(&prefix) || !file_name.ends_with(&suffix) {
                continue;
            }
            let name = file_name
                .strip_prefix(&prefix)
                .unwrap()
                .strip_suffix(&suffix)
                .unwrap()
                .to_string();
            let object = self.parse_object(type_marker, namespace, &name, &entry.path())?;
            if selector.is_satisfied_by(&object.labels) {
                out.push(object);
            }
        }
        Ok(out)
    }

    async fn delete(&self, type_marker: &str, namespace: &str, name: &str) -> Result<()> {
        let _guard = self.lock.write();
        let metadata_path = self.metadata_path(type_marker, namespace, name)?;
        if !metadata_path.exists() {
            return Err(Error::not_found(format!("{type_marker} {namespace}/{name}")));
        }
        let object = self.parse_object(type_marker, namespace, name, &metadata_path)?;
        for key in object.data.keys() {
            let path = self.data_path(type_marker, namespace, name, key)?;
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| Error::Store(format!("removing {}: {e}", path.display())))?;
            }
        }
        fs::remove_file(&metadata_path)
            .map_err(|e| Error::Store(format!("removing {}: {e}", metadata_path.display())))
    }

    async fn binds(&self, object: &StoredObject) -> Result<BTreeMap<String, Bind>> {
        object
            .data
            .keys()
            .map(|key| {
                let path = self.data_path(&object.type_marker, &object.namespace, &object.name, key)?;
                Ok((key.clone(), Bind::HostPath(path.to_string_lossy().into_owned())))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(namespace: &str, name: &str) -> StoredObject {
        let mut data = BTreeMap::new();
        data.insert("greeting".to_string(), b"hi".to_vec());
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "demo".to_string());
        StoredObject {
            name: name.to_string(),
            namespace: namespace.to_string(),
            type_marker: "configmap".to_string(),
            labels,
            created_at: chrono::Utc::now(),
            data,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_data_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.put(sample("default", "cfg")).await.unwrap();

        let loaded = store.get("configmap", "default", "cfg").await.unwrap();
        assert_eq!(loaded.data.get("greeting").unwrap(), b"hi");
        assert_eq!(loaded.labels.get("app").unwrap(), "demo");
    }

    #[tokio::test]
    async fn data_key_file_matches_documented_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.put(sample("default", "cfg")).await.unwrap();

        let expected = dir
            .path()
            .join("configmaps")
            .join("default-cfg-k2dcm-greeting");
        assert!(expected.exists());
        assert_eq!(fs::read_to_string(expected).unwrap(), "hi");
    }

    #[tokio::test]
    async fn get_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        let err = store.get("configmap", "default", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn same_name_different_namespace_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.put(sample("ns-a", "cfg")).await.unwrap();
        store.put(sample("ns-b", "cfg")).await.unwrap();

        store.delete("configmap", "ns-a", "cfg").await.unwrap();
        assert!(store.get("configmap", "ns-b", "cfg").await.is_ok());
    }

    #[tokio::test]
    async fn list_filters_by_label_selector() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.put(sample("default", "cfg1")).await.unwrap();
        let mut other = sample("default", "cfg2");
        other.labels.insert("app".to_string(), "other".to_string());
        store.put(other).await.unwrap();

        let selector = LabelSelector::new().with("app", "demo");
        let found = store.list("configmap", "default", &selector).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "cfg1");
    }

    #[tokio::test]
    async fn binds_returns_absolute_host_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        let object = sample("default", "cfg");
        store.put(object.clone()).await.unwrap();

        let binds = store.binds(&object).await.unwrap();
        match binds.get("greeting").unwrap() {
            Bind::HostPath(path) => assert!(Path::new(path).is_absolute()),
            Bind::Volume(_) => panic!("expected host path bind"),
        }
    }
}
