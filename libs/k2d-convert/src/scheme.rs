//! The conversion scheme.
//!
//! Kubernetes' own apimachinery keeps a reflection-driven scheme mapping a
//! family of Go types (one "internal" type plus one struct per supported
//! API version) onto each other. `k8s-openapi` only ships the versioned
//! (`v1`) shape of each kind, so the "internal" side of every family here is
//! represented by the identical `v1` struct — the scheme still exists as a
//! registry so that a second version could be registered later without
//! touching call sites, which is the point of keeping the indirection at
//! all. A future iteration could generate the per-kind converters at build
//! time from a tag-dispatch table instead of registering them by hand.
use k2d_util::error::{Error, Result};

use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A group/version/kind, embedded in every Kubernetes object the scheme touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gvk {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
}

impl Gvk {
    pub const fn new(group: &'static str, version: &'static str, kind: &'static str) -> Self {
        Gvk { group, version, kind }
    }

    fn family(&self) -> (&'static str, &'static str) {
        (self.group, self.kind)
    }
}

/// Implemented by every `k8s-openapi` type the scheme knows how to carry.
pub trait KubeKind {
    const GVK: Gvk;
}

macro_rules! impl_kube_kind {
    ($ty:ty, $group:expr, $version:expr, $kind:expr) => {
        impl KubeKind for $ty {
            const GVK: Gvk = Gvk::new($group, $version, $kind);
        }
    };
}

impl_kube_kind!(k8s_openapi::api::core::v1::Pod, "", "v1", "Pod");
impl_kube_kind!(k8s_openapi::api::core::v1::Namespace, "", "v1", "Namespace");
impl_kube_kind!(k8s_openapi::api::core::v1::Service, "", "v1", "Service");
impl_kube_kind!(k8s_openapi::api::core::v1::ConfigMap, "", "v1", "ConfigMap");
impl_kube_kind!(k8s_openapi::api::core::v1::Secret, "", "v1", "Secret");
impl_kube_kind!(k8s_openapi::api::core::v1::Node, "", "v1", "Node");
impl_kube_kind!(
    k8s_openapi::api::core::v1::PersistentVolume,
    "",
    "v1",
    "PersistentVolume"
);
impl_kube_kind!(
    k8s_openapi::api::core::v1::PersistentVolumeClaim,
    "",
    "v1",
    "PersistentVolumeClaim"
);
impl_kube_kind!(
    k8s_openapi::api::apps::v1::Deployment,
    "apps",
    "v1",
    "Deployment"
);
impl_kube_kind!(
    k8s_openapi::api::apps::v1::StatefulSet,
    "apps",
    "v1",
    "StatefulSet"
);
impl_kube_kind!(
    k8s_openapi::api::apps::v1::DaemonSet,
    "apps",
    "v1",
    "DaemonSet"
);
impl_kube_kind!(k8s_openapi::api::batch::v1::Job, "batch", "v1", "Job");
impl_kube_kind!(
    k8s_openapi::api::storage::v1::StorageClass,
    "storage",
    "v1",
    "StorageClass"
);

/// Registry of kind families the scheme is allowed to convert. Populated at
/// startup with the core/apps/batch/storage families in use; stateless
/// after that.
#[derive(Debug, Default)]
pub struct ConversionScheme {
    families: HashSet<(&'static str, &'static str)>,
}

impl ConversionScheme {
    /// Build the scheme with every kind family this adapter understands registered.
    pub fn with_defaults() -> Self {
        let mut scheme = ConversionScheme::default();
        scheme.register::<k8s_openapi::api::core::v1::Pod>();
        scheme.register::<k8s_openapi::api::core::v1::Namespace>();
        scheme.register::<k8s_openapi::api::core::v1::Service>();
        scheme.register::<k8s_openapi::api::core::v1::ConfigMap>();
        scheme.register::<k8s_openapi::api::core::v1::Secret>();
        scheme.register::<k8s_openapi::api::core::v1::Node>();
        scheme.register::<k8s_openapi::api::core::v1::PersistentVolume>();
        scheme.register::<k8s_openapi::api::core::v1::PersistentVolumeClaim>();
        scheme.register::<k8s_openapi::api::apps::v1::Deployment>();
        scheme.register::<k8s_openapi::api::apps::v1::StatefulSet>();
        scheme.register::<k8s_openapi::api::apps::v1::DaemonSet>();
        scheme.register::<k8s_openapi::api::batch::v1::Job>();
        scheme.register::<k8s_openapi::api::storage::v1::StorageClass>();
        scheme
    }

    pub fn register<K: KubeKind>(&mut self) {
        self.families.insert(K::GVK.family());
    }

    fn ensure_registered(&self, gvk: &Gvk) -> Result<()> {
        if self.families.contains(&gvk.family()) {
            Ok(())
        } else {
            Err(Error::conversion(format!(
                "unknown kind: no conversion registered for {}/{}",
                gvk.group, gvk.kind
            )))
        }
    }

    /// Convert `src` into `Dst`. Direction is inferred from `Dst`'s GVK: both
    /// sides here are always the `v1` shape (see module docs), so this is a
    /// validating round trip through `serde_json::Value` rather than a
    /// structural transform, the same way it would be a no-op transform in
    /// a scheme with exactly one registered version.
    pub fn convert<Src, Dst>(&self, src: &Src) -> Result<Dst>
    where
        Src: KubeKind + Serialize,
        Dst: KubeKind + DeserializeOwned,
    {
        if Src::GVK.kind != Dst::GVK.kind {
            return Err(Error::conversion(format!(
                "mismatched family: cannot convert {} into {}",
                Src::GVK.kind,
                Dst::GVK.kind
            )));
        }
        self.ensure_registered(&Src::GVK)?;
        self.ensure_registered(&Dst::GVK)?;
        let value = serde_json::to_value(src)
            .map_err(|e| Error::Serialization("encoding source object".into(), e))?;
        serde_json::from_value(value)
            .map_err(|e| Error::Serialization("decoding destination object".into(), e))
    }

    /// As [`Self::convert`], but for the generic-container case: the caller
    /// holds a value whose own embedded `apiVersion`/`kind` names the
    /// source type, and wants it materialized as a specific destination GVK
    /// (used when re-hydrating a last-applied-configuration payload whose
    /// kind is only known at runtime).
    pub fn convert_to_version<Dst>(&self, src: &Value, preferred: Gvk) -> Result<Dst>
    where
        Dst: KubeKind + DeserializeOwned,
    {
        let src_kind = src
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::conversion("source object has no kind"))?;
        if src_kind != Dst::GVK.kind || src_kind != preferred.kind {
            return Err(Error::conversion(format!(
                "mismatched family: {src_kind} cannot be converted to {}",
                preferred.kind
            )));
        }
        self.ensure_registered(&preferred)?;
        self.ensure_registered(&Dst::GVK)?;
        serde_json::from_value(src.clone())
            .map_err(|e| Error::Serialization("decoding destination object".into(), e))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{Namespace, Pod};
    use kube::api::ObjectMeta;

    fn pod(name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn round_trips_a_registered_kind() {
        let scheme = ConversionScheme::with_defaults();
        let src = pod("web");
        let dst: Pod = scheme.convert(&src).unwrap();
        assert_eq!(dst.metadata.name.as_deref(), Some("web"));
    }

    #[test]
    fn rejects_mismatched_family() {
        let scheme = ConversionScheme::with_defaults();
        let src = pod("web");
        let err = scheme.convert::<Pod, Deployment>(&src).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn rejects_unregistered_kind() {
        let mut scheme = ConversionScheme::default();
        scheme.register::<Pod>();
        // Namespace was never registered.
        let src = Namespace {
            metadata: ObjectMeta {
                name: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = scheme.convert::<Namespace, Namespace>(&src).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }
}
