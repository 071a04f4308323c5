use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::client::{null_as_default, ArmClient};
use crate::error::Result;

/// Subscription metadata as returned by ARM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
}

impl Subscription {
    pub fn is_enabled(&self) -> bool {
        self.state.eq_ignore_ascii_case("Enabled")
    }

    /// Display name, or the id when the name is blank
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.subscription_id
        } else {
            &self.display_name
        }
    }
}

/// Every enabled subscription visible to the caller, sorted by name
pub async fn list_subscriptions(client: &ArmClient) -> Result<Vec<Subscription>> {
    let url = client.url(
        "/subscriptions",
        &[("api-version", client.config().subscriptions_api_version.as_str())],
    )?;
    let all: Vec<Subscription> = client.get_all(&url).await?;
    let total = all.len();

    let mut enabled: Vec<Subscription> = all.into_iter().filter(Subscription::is_enabled).collect();
    enabled.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.subscription_id.cmp(&b.subscription_id))
    });

    tracing::info!(total, enabled = enabled.len(), "Enumerated subscriptions");
    Ok(enabled)
}

/// Metadata of a single subscription
pub async fn get_subscription(client: &ArmClient, subscription_id: &str) -> Result<Subscription> {
    let url = client.url(
        &format!("/subscriptions/{}", subscription_id),
        &[("api-version", client.config().subscriptions_api_version.as_str())],
    )?;
    client.get_json(&url).await
}
