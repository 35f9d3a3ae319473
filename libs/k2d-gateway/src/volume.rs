use k2d_util::error::Result;

use std::collections::HashMap;

use bollard::volume::{CreateVolumeOptions, ListVolumesOptions};
use k2d_convert::engine::model::EngineVolume;

use crate::error::map_engine_error;
use crate::Gateway;

impl Gateway {
    pub async fn list_volumes(&self, label_filter: Option<(&str, &str)>) -> Result<Vec<EngineVolume>> {
        let mut filters = HashMap::new();
        if let Some((key, value)) = label_filter {
            filters.insert("label".to_string(), vec![format!("{key}={value}")]);
        }
        let response = self
            .docker
            .list_volumes(Some(ListVolumesOptions { filters }))
            .await
            .map_err(|e| map_engine_error("listing volumes", e))?;
        Ok(response
            .volumes
            .unwrap_or_default()
            .iter()
            .map(to_engine_volume)
            .collect())
    }

    pub async fn inspect_volume(&self, name: &str) -> Result<EngineVolume> {
        let volume = self
            .docker
            .inspect_volume(name)
            .await
            .map_err(|e| map_engine_error(&format!("inspecting volume {name}"), e))?;
        Ok(to_engine_volume(&volume))
    }

    pub async fn create_volume(&self, name: &str, labels: &HashMap<String, String>) -> Result<EngineVolume> {
        let volume = self
            .docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                labels: labels.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| map_engine_error(&format!("creating volume {name}"), e))?;
        Ok(to_engine_volume(&volume))
    }

    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<()> {
        self.docker
            .remove_volume(name, Some(bollard::volume::RemoveVolumeOptions { force }))
            .await
            .map_err(|e| map_engine_error(&format!("removing volume {name}"), e))
    }
}

fn to_engine_volume(volume: &bollard::models::Volume) -> EngineVolume {
    EngineVolume {
        name: volume.name.clone(),
        mountpoint: volume.mountpoint.clone(),
        labels: volume.labels.clone().into_iter().collect(),
        created_at: volume
            .created_at
            .as_deref()
            .and_then(k2d_util::time::parse_rfc3339),
    }
}
