//! Shared create-or-replace and transactional-replace policies for
//! container lifecycle management.

use k2d_convert::engine::model::{ContainerCreateSpec, EngineContainer};
use k2d_gateway::Gateway;
use k2d_util::error::Result;
use k2d_util::naming;

/// Create `name` from `spec` unless an identical container (same
/// workload-last-applied label) already exists, in which case this is a
/// no-op. Otherwise the existing container, if any, is force-removed first.
pub async fn create_or_replace(
    gateway: &Gateway,
    name: &str,
    last_applied: &str,
    spec: &ContainerCreateSpec,
) -> Result<EngineContainer> {
    if let Ok(existing) = gateway.inspect_container(name).await {
        if existing.label(naming::LABEL_LAST_APPLIED) == Some(last_applied) {
            return Ok(existing);
        }
        gateway.remove_container(name, true).await?;
    }

    gateway.create_container(name, spec).await?;
    gateway.start_container(name).await?;
    gateway.inspect_container(name).await
}

/// Replace a running container's configuration in place via a shadow name,
/// used for Service-driven mutations of an existing workload container.
/// The replacement is transactional: stop, create under a shadow name,
/// start; on start failure the shadow is removed and the original is
/// restarted; on success the original is removed and the shadow renamed.
pub async fn replace_in_place(
    gateway: &Gateway,
    name: &str,
    spec: &ContainerCreateSpec,
) -> Result<EngineContainer> {
    let shadow = naming::shadow_name(name);

    gateway.stop_container(name).await?;
    gateway.create_container(&shadow, spec).await?;

    match gateway.start_container(&shadow).await {
        Ok(()) => {}
        Err(start_err) => {
            let _ = gateway.remove_container(&shadow, true).await;
            gateway.start_container(name).await?;
            return Err(start_err);
        }
    }

    gateway.remove_container(name, true).await?;
    // A rename failure here leaves the shadow running under its temporary
    // name rather than stopping a healthy workload; the error is surfaced
    // to the caller unchanged.
    gateway.rename_container(&shadow, name).await?;
    gateway.inspect_container(name).await
}
