use serde::Deserialize;
use std::collections::BTreeMap;

use super::client::ArmClient;
use crate::error::Result;

const SUBSCRIPTION_ENTITY: &str = "/subscriptions";

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    properties: EntityProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityProperties {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    parent: Option<EntityParent>,
}

#[derive(Debug, Deserialize)]
struct EntityParent {
    #[serde(default)]
    id: String,
}

/// Subscription id to the display name of its direct parent management group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagementGroupIndex {
    by_subscription: BTreeMap<String, String>,
}

impl ManagementGroupIndex {
    fn from_entities(entities: Vec<Entity>) -> Self {
        let mut groups: BTreeMap<String, String> = BTreeMap::new();
        let mut parents: Vec<(String, String)> = Vec::new();

        for entity in entities {
            if entity.entity_type.eq_ignore_ascii_case(SUBSCRIPTION_ENTITY) {
                if let Some(parent) = entity.properties.parent {
                    parents.push((entity.name.to_lowercase(), parent.id.to_lowercase()));
                }
            } else {
                let label = entity
                    .properties
                    .display_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| entity.name.clone());
                groups.insert(entity.id.to_lowercase(), label);
            }
        }

        let by_subscription = parents
            .into_iter()
            .map(|(subscription, parent_id)| {
                let label = groups.get(&parent_id).cloned().unwrap_or_else(|| {
                    // Last path segment is the group name
                    parent_id.rsplit('/').next().unwrap_or_default().to_string()
                });
                (subscription, label)
            })
            .collect();

        Self { by_subscription }
    }

    pub fn lookup(&self, subscription_id: &str) -> Option<&str> {
        self.by_subscription
            .get(&subscription_id.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_subscription.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subscription.is_empty()
    }
}

/// Resolve management-group membership for every visible subscription
pub async fn fetch_index(client: &ArmClient) -> Result<ManagementGroupIndex> {
    let url = client.url(
        "/providers/Microsoft.Management/getEntities",
        &[("api-version", client.config().management_groups_api_version.as_str())],
    )?;
    let entities: Vec<Entity> = client.post_all(&url).await?;
    let index = ManagementGroupIndex::from_entities(entities);
    tracing::info!(subscriptions = index.len(), "Resolved management groups");
    Ok(index)
}
