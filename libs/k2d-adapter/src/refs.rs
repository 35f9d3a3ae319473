//! Builds the [`ResolvedRefs`] snapshot a pod spec needs before it can be
//! converted to an engine container: every ConfigMap, Secret and PVC it
//! references, resolved up front so the converter itself stays pure.

use k2d_convert::engine::refs::ResolvedRefs;
use k8s_openapi::api::core::v1::PodSpec;
use k2d_util::error::Result;

use crate::configmap;
use crate::context::AdapterContext;
use crate::secret;

pub async fn resolve(ctx: &AdapterContext, namespace: &str, pod_spec: &PodSpec) -> Result<ResolvedRefs> {
    let mut refs = ResolvedRefs::default();

    let mut config_map_names = Vec::new();
    let mut secret_names = Vec::new();
    let mut pvc_names = Vec::new();

    for container in &pod_spec.containers {
        for from in container.env_from.iter().flatten() {
            if let Some(cm) = &from.config_map_ref {
                if let Some(name) = &cm.name {
                    config_map_names.push(name.clone());
                }
            }
            if let Some(secret_ref) = &from.secret_ref {
                if let Some(name) = &secret_ref.name {
                    secret_names.push(name.clone());
                }
            }
        }
        for env in container.env.iter().flatten() {
            let Some(from) = &env.value_from else { continue };
            if let Some(cm_ref) = &from.config_map_key_ref {
                if let Some(name) = &cm_ref.name {
                    config_map_names.push(name.clone());
                }
            }
            if let Some(secret_ref) = &from.secret_key_ref {
                if let Some(name) = &secret_ref.name {
                    secret_names.push(name.clone());
                }
            }
        }
    }

    for volume in pod_spec.volumes.iter().flatten() {
        if let Some(cm) = &volume.config_map {
            if let Some(name) = &cm.name {
                config_map_names.push(name.clone());
            }
        }
        if let Some(secret) = &volume.secret {
            if let Some(name) = &secret.secret_name {
                secret_names.push(name.clone());
            }
        }
        if let Some(pvc) = &volume.persistent_volume_claim {
            pvc_names.push(pvc.claim_name.clone());
        }
    }

    config_map_names.sort();
    config_map_names.dedup();
    for name in config_map_names {
        if let Ok((data, binds)) = configmap::load_for_refs(ctx, namespace, &name).await {
            refs.config_map_data.insert((namespace.to_string(), name.clone()), data);
            refs.config_map_binds.insert((namespace.to_string(), name), binds);
        }
    }

    secret_names.sort();
    secret_names.dedup();
    for name in secret_names {
        if let Ok((data, binds)) = secret::load_for_refs(ctx, namespace, &name).await {
            refs.secret_data.insert((namespace.to_string(), name.clone()), data);
            refs.secret_binds.insert((namespace.to_string(), name), binds);
        }
    }

    pvc_names.sort();
    pvc_names.dedup();
    for claim in pvc_names {
        let pv_name = k2d_util::naming::pv_name(namespace, &claim);
        if ctx.gateway.inspect_volume(&pv_name).await.is_ok() {
            refs.pvc_volumes.insert(claim, pv_name);
        }
    }

    Ok(refs)
}
