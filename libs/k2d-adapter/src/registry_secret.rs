//! Registry-secret sub-adapter: decodes a `kubernetes.io/dockerconfigjson`
//! Secret's `.dockerconfigjson` entry into per-registry credentials,
//! stored independently of the general Secret store so its backend can be
//! configured separately.

use std::collections::BTreeMap;

use base64::Engine;
use k2d_gateway::RegistryAuth;
use k2d_util::error::{Error, Result};
use k8s_openapi::api::core::v1::Secret;
use serde::Deserialize;

use k2d_store::StoredObject;

use crate::context::AdapterContext;

const TYPE_MARKER: &str = "registry-secret";
const DOCKERCONFIGJSON_KEY: &str = ".dockerconfigjson";

#[derive(Debug, Deserialize)]
struct DockerConfigJson {
    auths: BTreeMap<String, DockerConfigAuth>,
}

#[derive(Debug, Deserialize)]
struct DockerConfigAuth {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

pub async fn mirror(ctx: &AdapterContext, namespace: &str, name: &str, secret: &Secret) -> Result<()> {
    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(DOCKERCONFIGJSON_KEY))
        .ok_or_else(|| Error::validation("dockerconfigjson secret missing .dockerconfigjson key"))?;

    let object = StoredObject {
        name: name.to_string(),
        namespace: namespace.to_string(),
        type_marker: TYPE_MARKER.to_string(),
        labels: secret.metadata.labels.clone().unwrap_or_default(),
        created_at: ctx.now(),
        data: BTreeMap::from([(DOCKERCONFIGJSON_KEY.to_string(), bytes.0.clone())]),
    };
    ctx.registry_store.put(object).await
}

/// Resolves the credential for `registry_domain` out of the named Secret.
/// The matching auths entry is decoded and passed to the gateway; an
/// absent secret or missing registry entry is a hard error.
pub async fn resolve_auth(
    ctx: &AdapterContext,
    namespace: &str,
    name: &str,
    registry_domain: &str,
) -> Result<RegistryAuth> {
    let object = ctx.registry_store.get(TYPE_MARKER, namespace, name).await?;
    let bytes = object
        .data
        .get(DOCKERCONFIGJSON_KEY)
        .ok_or_else(|| Error::validation("registry secret has no .dockerconfigjson entry"))?;
    let parsed: DockerConfigJson = serde_json::from_slice(bytes)
        .map_err(|e| Error::Serialization("decoding .dockerconfigjson".into(), e))?;

    let entry = parsed.auths.get(registry_domain).ok_or_else(|| {
        Error::validation(format!("no registry credential for {registry_domain} in {namespace}/{name}"))
    })?;

    if let (Some(username), Some(password)) = (&entry.username, &entry.password) {
        return Ok(RegistryAuth {
            username: username.clone(),
            password: password.clone(),
            server_address: Some(registry_domain.to_string()),
        });
    }

    let auth = entry
        .auth
        .as_ref()
        .ok_or_else(|| Error::validation(format!("registry credential for {registry_domain} has no auth or username/password")))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth)
        .map_err(|e| Error::validation(format!("decoding base64 auth for {registry_domain}: {e}")))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| Error::validation(format!("auth for {registry_domain} is not valid utf-8: {e}")))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| Error::validation(format!("auth for {registry_domain} is not username:password")))?;

    Ok(RegistryAuth {
        username: username.to_string(),
        password: password.to_string(),
        server_address: Some(registry_domain.to_string()),
    })
}
