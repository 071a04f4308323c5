use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::client::ArmClient;
use crate::core::region::primary_region;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    location: String,
}

/// Resource counts of one subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceInventory {
    pub total: u64,
    pub by_location: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
}

impl ResourceInventory {
    pub fn record(&mut self, resource_type: &str, location: &str) {
        self.total += 1;
        *self.by_location.entry(location.to_string()).or_default() += 1;
        *self.by_type.entry(resource_type.to_lowercase()).or_default() += 1;
    }

    pub fn primary_region(&self) -> Option<String> {
        primary_region(&self.by_location)
    }
}

pub async fn fetch_inventory(client: &ArmClient, subscription_id: &str) -> Result<ResourceInventory> {
    let url = client.url(
        &format!("/subscriptions/{}/resources", subscription_id),
        &[("api-version", client.config().resources_api_version.as_str())],
    )?;

    let mut inventory = ResourceInventory::default();
    client
        .get_pages(&url, |page: Vec<Resource>| {
            for resource in &page {
                inventory.record(&resource.resource_type, &resource.location);
            }
            true
        })
        .await?;

    tracing::debug!(
        subscription = subscription_id,
        resources = inventory.total,
        "Fetched resource inventory"
    );
    Ok(inventory)
}
