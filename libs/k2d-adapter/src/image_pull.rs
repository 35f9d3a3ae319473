//! Image pull, performed before container create.

use k2d_util::error::{Error, Result};
use k2d_util::parse::split_image_reference;
use k8s_openapi::api::core::v1::LocalObjectReference;

use crate::context::AdapterContext;
use crate::registry_secret;

pub async fn pull(
    ctx: &AdapterContext,
    namespace: &str,
    image: &str,
    pull_secrets: &[LocalObjectReference],
) -> Result<()> {
    let (registry_domain, _) = split_image_reference(image);

    let auth = match pull_secrets.first() {
        Some(secret_ref) => {
            let name = secret_ref
                .name
                .clone()
                .ok_or_else(|| Error::validation("imagePullSecrets entry has no name"))?;
            Some(registry_secret::resolve_auth(ctx, namespace, &name, &registry_domain).await?)
        }
        None => None,
    };

    ctx.gateway.pull_image(image, auth).await
}
