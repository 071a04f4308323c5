use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::azure::{activity, management_groups, resources, subscriptions};
use crate::azure::{ArmClient, ManagementGroupIndex, ResourceInventory, Subscription};
use crate::billing::calculator::ActivitySample;
use crate::config::Config;
use crate::error::{EstimatorError, Result};
use crate::utils::inventory::InventoryRecord;

/// Raw per-subscription inputs. Each part fails independently so one
/// broken endpoint degrades the estimate instead of dropping it.
#[derive(Debug)]
pub struct SubscriptionData {
    pub activity: Result<ActivitySample>,
    pub resources: Result<ResourceInventory>,
    pub management_group: Option<String>,
}

/// Where subscriptions and their metrics come from
#[derive(Debug)]
pub enum DataSource {
    Azure {
        client: ArmClient,
        management_groups: Option<ManagementGroupIndex>,
    },
    Inventory {
        records: BTreeMap<String, InventoryRecord>,
    },
}

impl DataSource {
    /// Live Azure source. Management groups are resolved up front when
    /// enabled; a failure there only loses the grouping.
    pub async fn azure(client: ArmClient, config: &Config) -> DataSource {
        let management_groups = if config.output.include_management_groups {
            match management_groups::fetch_index(&client).await {
                Ok(index) => Some(index),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to resolve management groups");
                    Some(ManagementGroupIndex::default())
                }
            }
        } else {
            None
        };

        DataSource::Azure {
            client,
            management_groups,
        }
    }

    pub fn inventory(records: Vec<InventoryRecord>) -> DataSource {
        let records = records
            .into_iter()
            .map(|r| (r.subscription.subscription_id.to_lowercase(), r))
            .collect();
        DataSource::Inventory { records }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataSource::Azure { .. } => "azure",
            DataSource::Inventory { .. } => "inventory",
        }
    }

    /// Enabled subscriptions, or just `only` when given
    pub async fn subscriptions(&self, only: Option<&str>) -> Result<Vec<Subscription>> {
        match self {
            DataSource::Azure { client, .. } => match only {
                Some(id) => {
                    let subscription = subscriptions::get_subscription(client, id).await?;
                    if !subscription.is_enabled() {
                        tracing::warn!(
                            subscription = id,
                            state = %subscription.state,
                            "Requested subscription is not enabled"
                        );
                    }
                    Ok(vec![subscription])
                }
                None => subscriptions::list_subscriptions(client).await,
            },
            DataSource::Inventory { records } => {
                if let Some(id) = only {
                    return records
                        .get(&id.to_lowercase())
                        .map(|r| vec![r.subscription.clone()])
                        .ok_or_else(|| {
                            EstimatorError::Inventory(format!(
                                "subscription {} is not in the inventory",
                                id
                            ))
                        });
                }

                let mut subscriptions: Vec<Subscription> = records
                    .values()
                    .filter(|r| r.is_enabled())
                    .map(|r| r.subscription.clone())
                    .collect();
                subscriptions.sort_by(|a, b| {
                    a.name()
                        .cmp(b.name())
                        .then_with(|| a.subscription_id.cmp(&b.subscription_id))
                });
                Ok(subscriptions)
            }
        }
    }

    /// Gather activity, resources and management group for one subscription
    pub async fn fetch(
        &self,
        subscription: &Subscription,
        config: &Config,
        now: DateTime<Utc>,
    ) -> SubscriptionData {
        let id = subscription.subscription_id.as_str();

        match self {
            DataSource::Azure {
                client,
                management_groups,
            } => {
                let (activity, resources) = tokio::join!(
                    activity::sample_activity(
                        client,
                        id,
                        config.sampling.days_to_analyze,
                        config.sampling.sample_size,
                        now,
                    ),
                    resources::fetch_inventory(client, id),
                );
                SubscriptionData {
                    activity,
                    resources,
                    management_group: management_groups
                        .as_ref()
                        .and_then(|index| index.lookup(id))
                        .map(str::to_string),
                }
            }
            DataSource::Inventory { records } => match records.get(&id.to_lowercase()) {
                Some(record) => SubscriptionData {
                    activity: record.activity.map(ActivitySample::from).ok_or_else(|| {
                        EstimatorError::Inventory("no activity sample recorded".to_string())
                    }),
                    resources: Ok(record.resources.clone()),
                    management_group: record.management_group.clone(),
                },
                None => {
                    let missing = || EstimatorError::Inventory(format!("{} not in inventory", id));
                    SubscriptionData {
                        activity: Err(missing()),
                        resources: Err(missing()),
                        management_group: None,
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::inventory::RecordedActivity;

    fn record(id: &str, name: &str, state: &str) -> InventoryRecord {
        InventoryRecord {
            subscription: Subscription {
                subscription_id: id.to_string(),
                display_name: name.to_string(),
                state: state.to_string(),
                tags: BTreeMap::new(),
            },
            management_group: Some("Corp".to_string()),
            activity: Some(RecordedActivity {
                sampled_entries: 10,
                sampled_bytes: 1000,
                covered_days: 1.0,
            }),
            resources: ResourceInventory::default(),
        }
    }

    #[tokio::test]
    async fn test_inventory_source() {
        let source = DataSource::inventory(vec![
            record("B", "beta", "Enabled"),
            record("a", "alpha", ""),
            record("c", "gamma", "Disabled"),
        ]);

        let subscriptions = source.subscriptions(None).await.unwrap();
        let names: Vec<&str> = subscriptions.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        let only = source.subscriptions(Some("b")).await.unwrap();
        assert_eq!(only[0].display_name, "beta");
        assert!(source.subscriptions(Some("zzz")).await.is_err());

        let data = source.fetch(&subscriptions[0], &Config::default(), Utc::now()).await;
        assert_eq!(data.activity.unwrap().sampled_entries, 10);
        assert_eq!(data.management_group.as_deref(), Some("Corp"));
    }
}
