//! Engine-volume backend: one engine-managed volume per object; data is
//! moved in and out through a short-lived helper container that exchanges
//! a TAR stream, with each entry optionally AES-GCM-sealed.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use k2d_convert::engine::model::{Bind as EngineBind, BindTarget, ContainerCreateSpec};
use k2d_util::error::{Error, Result};
use k2d_util::naming;
use k2d_util::naming::LABEL_NAMESPACE_NAME;
use k2d_gateway::Gateway;

use crate::crypto::{self, EncryptionKey};
use crate::{Bind, LabelSelector, ObjectStore, StoredObject};

const DATA_MOUNT: &str = "/data";
const LABEL_TYPE_MARKER: &str = "k2d.io/type-marker";
const LABEL_CREATED_AT: &str = "k2d.io/created-at";

static HELPER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct VolumeStoreConfig {
    pub helper_image: String,
    pub encryption_key: Option<EncryptionKey>,
}

impl Default for VolumeStoreConfig {
    fn default() -> Self {
        Self {
            helper_image: "busybox:stable".to_string(),
            encryption_key: None,
        }
    }
}

pub struct VolumeStore {
    gateway: Gateway,
    config: VolumeStoreConfig,
}

impl VolumeStore {
    pub fn new(gateway: Gateway, config: VolumeStoreConfig) -> Self {
        Self { gateway, config }
    }

    fn volume_name(type_marker: &str, namespace: &str, name: &str) -> String {
        match type_marker {
            "configmap" => naming::configmap_volume_name(namespace, name),
            "secret" => naming::secret_volume_name(namespace, name),
            _ => format!("{type_marker}-{namespace}-{name}"),
        }
    }

    /// Monotonic-enough within a process: wall-clock nanoseconds plus a
    /// strictly increasing counter break ties on platforms with coarse
    /// clock resolution.
    fn helper_name(op: &str, volume: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let sequence = HELPER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!("k2d-volume-{op}-{volume}-{nanos}{sequence}")
    }

    async fn run_helper<F, Fut, T>(&self, op: &str, volume: &str, body: F) -> Result<T>
    where
        F: FnOnce(Gateway, String) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let name = Self::helper_name(op, volume);
        let spec = ContainerCreateSpec {
            image: self.config.helper_image.clone(),
            command: Some(vec!["sleep".to_string(), "3600".to_string()]),
            binds: vec![EngineBind {
                target: BindTarget::Volume(volume.to_string()),
                mount_path: DATA_MOUNT.to_string(),
                read_only: false,
            }],
            network_name: "none".to_string(),
            ..Default::default()
        };
        self.gateway.create_container(&name, &spec).await?;
        self.gateway.start_container(&name).await?;

        let result = body(self.gateway.clone(), name.clone()).await;

        let _ = self.gateway.stop_container(&name).await;
        let _ = self.gateway.remove_container(&name, true).await;
        result
    }

    fn seal_entries(&self, data: &BTreeMap<String, Vec<u8>>) -> Result<BTreeMap<String, Vec<u8>>> {
        match &self.config.encryption_key {
            Some(key) => data
                .iter()
                .map(|(name, bytes)| Ok((name.clone(), crypto::seal(key, bytes)?)))
                .collect(),
            None => Ok(data.clone()),
        }
    }

    fn open_entries(&self, data: BTreeMap<String, Vec<u8>>) -> Result<BTreeMap<String, Vec<u8>>> {
        match &self.config.encryption_key {
            Some(key) => data
                .into_iter()
                .map(|(name, bytes)| Ok((name, crypto::open(key, &bytes)?)))
                .collect(),
            None => Ok(data),
        }
    }
}

fn build_tar(entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, bytes) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, Cursor::new(bytes))
            .map_err(|e| Error::Store(format!("building tar entry {name}: {e}")))?;
    }
    builder
        .into_inner()
        .map_err(|e| Error::Store(format!("finishing tar archive: {e}")))
}

fn parse_tar(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut out = BTreeMap::new();
    for entry in archive
        .entries()
        .map_err(|e| Error::Store(format!("reading tar archive: {e}")))?
    {
        let mut entry = entry.map_err(|e| Error::Store(format!("reading tar entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| Error::Store(format!("reading tar entry path: {e}")))?
            .to_string_lossy()
            .trim_start_matches("./")
            .to_string();
        if path.is_empty() {
            continue;
        }
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::Store(format!("reading tar entry {path}: {e}")))?;
        out.insert(path, bytes);
    }
    Ok(out)
}

#[async_trait]
impl ObjectStore for VolumeStore {
    async fn put(&self, object: StoredObject) -> Result<()> {
        let volume = Self::volume_name(&object.type_marker, &object.namespace, &object.name);
        let mut labels = object.labels.clone();
        labels.insert(LABEL_NAMESPACE_NAME.to_string(), object.namespace.clone());
        labels.insert(LABEL_TYPE_MARKER.to_string(), object.type_marker.clone());
        labels.insert(
            LABEL_CREATED_AT.to_string(),
            k2d_util::time::format_rfc3339(object.created_at),
        );

        if self.gateway.inspect_volume(&volume).await.is_err() {
            self.gateway.create_volume(&volume, &labels).await?;
        }

        let sealed = self.seal_entries(&object.data)?;
        let tar = build_tar(&sealed)?;
        self.run_helper("copy", &volume, move |gateway, helper| async move {
            gateway.upload_to_container(&helper, DATA_MOUNT, tar).await
        })
        .await
    }

    async fn get(&self, type_marker: &str, namespace: &str, name: &str) -> Result<StoredObject> {
        let volume = Self::volume_name(type_marker, namespace, name);
        let info = self
            .gateway
            .inspect_volume(&volume)
            .await
            .map_err(|_| Error::not_found(format!("{type_marker} {namespace}/{name}")))?;

        let tar = self
            .run_helper("read", &volume, move |gateway, helper| async move {
                gateway.download_from_container(&helper, DATA_MOUNT).await
            })
            .await?;
        let data = self.open_entries(parse_tar(&tar)?)?;

        let mut labels = info.labels.clone();
        labels.remove(LABEL_NAMESPACE_NAME);
        labels.remove(LABEL_TYPE_MARKER);
        let created_at = labels
            .remove(LABEL_CREATED_AT)
            .and_then(|s| k2d_util::time::parse_rfc3339(&s))
            .unwrap_or(info.created_at.unwrap_or_else(chrono::Utc::now));

        Ok(StoredObject {
            name: name.to_string(),
            namespace: namespace.to_string(),
            type_marker: type_marker.to_string(),
            labels,
            created_at,
            data,
        })
    }

    async fn list(&self, type_marker: &str, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>> {
        let volumes = self
            .gateway
            .list_volumes(Some((LABEL_TYPE_MARKER, type_marker)))
            .await?;
        let prefix = format!("{type_marker}-{namespace}-");
        let mut out = Vec::new();
        for volume in volumes {
            if !volume.name.starts_with(&prefix) {
                continue;
            }
            if volume.labels.get(LABEL_NAMESPACE_NAME).map(String::as_str) != Some(namespace) {
                continue;
            }
            if !selector.is_satisfied_by(&volume.labels) {
                continue;
            }
            let name = volume.name.trim_start_matches(&prefix).to_string();
            out.push(self.get(type_marker, namespace, &name).await?);
        }
        Ok(out)
    }

    async fn delete(&self, type_marker: &str, namespace: &str, name: &str) -> Result<()> {
        let volume = Self::volume_name(type_marker, namespace, name);
        if self.gateway.inspect_volume(&volume).await.is_err() {
            return Err(Error::not_found(format!("{type_marker} {namespace}/{name}")));
        }
        self.gateway.remove_volume(&volume, true).await
    }

    async fn binds(&self, object: &StoredObject) -> Result<BTreeMap<String, Bind>> {
        let mut out = BTreeMap::new();
        let volume = Self::volume_name(&object.type_marker, &object.namespace, &object.name);
        out.insert("volume".to_string(), Bind::Volume(volume));
        Ok(out)
    }
}
