use k2d_util::error::Result;
use k2d_util::naming;

use std::collections::HashMap;

use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use k2d_convert::engine::model::EngineNetwork;

use crate::error::map_engine_error;
use crate::Gateway;

impl Gateway {
    pub async fn list_networks(&self, label_filter: Option<(&str, &str)>) -> Result<Vec<EngineNetwork>> {
        let mut filters = HashMap::new();
        if let Some((key, value)) = label_filter {
            filters.insert("label".to_string(), vec![format!("{key}={value}")]);
        }
        let networks = self
            .docker
            .list_networks(Some(ListNetworksOptions { filters }))
            .await
            .map_err(|e| map_engine_error("listing networks", e))?;
        Ok(networks.iter().map(to_engine_network).collect())
    }

    pub async fn inspect_network(&self, name: &str) -> Result<EngineNetwork> {
        let network = self
            .docker
            .inspect_network(name, None::<bollard::network::InspectNetworkOptions<String>>)
            .await
            .map_err(|e| map_engine_error(&format!("inspecting network {name}"), e))?;
        Ok(to_engine_network(&network))
    }

    pub async fn create_network(&self, name: &str, labels: &HashMap<String, String>) -> Result<String> {
        let response = self
            .docker
            .create_network(CreateNetworkOptions {
                name: name.to_string(),
                driver: "bridge".to_string(),
                labels: labels.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| map_engine_error(&format!("creating network {name}"), e))?;
        Ok(response.id.unwrap_or_default())
    }

    pub async fn remove_network(&self, name: &str) -> Result<()> {
        self.docker
            .remove_network(name)
            .await
            .map_err(|e| map_engine_error(&format!("removing network {name}"), e))
    }
}

fn to_engine_network(network: &bollard::models::Network) -> EngineNetwork {
    EngineNetwork {
        id: network.id.clone().unwrap_or_default(),
        name: network
            .name
            .as_deref()
            .map(|n| naming::strip_leading_slash(n).to_string())
            .unwrap_or_default(),
        labels: network.labels.clone().unwrap_or_default().into_iter().collect(),
        created_at: network
            .created
            .as_deref()
            .and_then(k2d_util::time::parse_rfc3339),
    }
}
