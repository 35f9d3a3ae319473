//! Last-applied sourcing: prefer the client-stamped
//! `kubectl.kubernetes.io/last-applied-configuration` annotation; otherwise
//! synthesize it by serializing the incoming object, preserving faithful
//! round-trip for clients that never stamp it.

use std::collections::BTreeMap;

use k2d_util::error::{Error, Result};
use k2d_util::naming::ANNOTATION_LAST_APPLIED_CONFIG;
use serde::Serialize;

pub fn resolve<T: Serialize>(object: &T, annotations: Option<&BTreeMap<String, String>>) -> Result<String> {
    if let Some(annotations) = annotations {
        if let Some(stamped) = annotations.get(ANNOTATION_LAST_APPLIED_CONFIG) {
            return Ok(stamped.clone());
        }
    }
    serde_json::to_string(object).map_err(|e| Error::Serialization("synthesizing last-applied-configuration".into(), e))
}
