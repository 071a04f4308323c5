use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{CostBreakdown, JobFailure, PricingSnapshot, PricingSource, SubscriptionEstimate};
use crate::config::PricingMode;
use crate::error::Result;

/// Label used for subscriptions outside any management group
const UNASSIGNED: &str = "Unassigned";

/// Aggregated cost of every subscription sharing a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub monthly_cost: f64,
    pub subscription_count: usize,
    /// Member subscription names, sorted
    pub subscriptions: Vec<String>,
}

/// Dimension a report is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    BusinessUnit,
    ManagementGroup,
    Environment,
    Region,
}

impl GroupKey {
    pub fn label<'a>(&self, estimate: &'a SubscriptionEstimate) -> &'a str {
        match self {
            GroupKey::BusinessUnit => &estimate.business_unit,
            GroupKey::ManagementGroup => estimate.management_group.as_deref().unwrap_or(UNASSIGNED),
            GroupKey::Environment => &estimate.environment,
            GroupKey::Region => &estimate.region,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GroupKey::BusinessUnit => "Business Unit",
            GroupKey::ManagementGroup => "Management Group",
            GroupKey::Environment => "Environment",
            GroupKey::Region => "Region",
        }
    }
}

/// Sort by cost descending, then label
fn sort_groups(groups: &mut [GroupSummary]) {
    groups.sort_by(|a, b| {
        b.monthly_cost
            .total_cmp(&a.monthly_cost)
            .then_with(|| a.label.cmp(&b.label))
    });
}

/// Sum estimates per label. Each estimate lands in exactly one group.
pub fn group_by(estimates: &[SubscriptionEstimate], key: GroupKey) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<&str, GroupSummary> = BTreeMap::new();

    for estimate in estimates {
        let label = key.label(estimate);
        let group = groups.entry(label).or_insert_with(|| GroupSummary {
            label: label.to_string(),
            monthly_cost: 0.0,
            subscription_count: 0,
            subscriptions: Vec::new(),
        });
        group.monthly_cost += estimate.monthly_cost;
        group.subscription_count += 1;
        group.subscriptions.push(estimate.subscription_name.clone());
    }

    let mut groups: Vec<GroupSummary> = groups
        .into_values()
        .map(|mut group| {
            group.subscriptions.sort();
            group
        })
        .collect();
    sort_groups(&mut groups);
    groups
}

/// Sum of every subscription's monthly cost
pub fn grand_total(estimates: &[SubscriptionEstimate]) -> f64 {
    estimates.iter().map(|e| e.monthly_cost).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSubscription {
    pub rank: usize,
    pub subscription_id: String,
    pub subscription_name: String,
    pub business_unit: String,
    pub monthly_cost: f64,
}

/// Orders estimates by cost descending, then name, then id
fn sort_estimates(estimates: &mut [SubscriptionEstimate]) {
    estimates.sort_by(|a, b| {
        b.monthly_cost
            .total_cmp(&a.monthly_cost)
            .then_with(|| a.subscription_name.cmp(&b.subscription_name))
            .then_with(|| a.subscription_id.cmp(&b.subscription_id))
    });
}

/// The `n` most expensive subscriptions
pub fn top_subscriptions(estimates: &[SubscriptionEstimate], n: usize) -> Vec<RankedSubscription> {
    let mut sorted = estimates.to_vec();
    sort_estimates(&mut sorted);
    sorted
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, e)| RankedSubscription {
            rank: i + 1,
            subscription_id: e.subscription_id,
            subscription_name: e.subscription_name,
            business_unit: e.business_unit,
            monthly_cost: e.monthly_cost,
        })
        .collect()
}

/// Settings the run was performed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub days_to_analyze: u32,
    pub sample_size: usize,
    pub pricing_mode: PricingMode,
    pub workers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<String>,
}

/// Where the prices used by a run came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingProvenance {
    pub source: PricingSource,
    pub fetched_at: DateTime<Utc>,
    pub currency: String,
    pub regions: usize,
}

impl From<&PricingSnapshot> for PricingProvenance {
    fn from(snapshot: &PricingSnapshot) -> Self {
        PricingProvenance {
            source: snapshot.source,
            fetched_at: snapshot.fetched_at,
            currency: snapshot.currency.clone(),
            regions: snapshot.regions.len(),
        }
    }
}

/// Complete result of a run, the document behind every exported report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub generated_at: DateTime<Utc>,
    pub parameters: RunParameters,
    pub pricing: PricingProvenance,
    pub grand_total: f64,
    pub cost_breakdown: CostBreakdown,
    pub subscriptions: Vec<SubscriptionEstimate>,
    pub by_business_unit: Vec<GroupSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_management_group: Option<Vec<GroupSummary>>,
    pub by_environment: Vec<GroupSummary>,
    pub by_region: Vec<GroupSummary>,
    pub top_subscriptions: Vec<RankedSubscription>,
    #[serde(default)]
    pub failures: Vec<JobFailure>,
}

impl CostReport {
    pub fn build(
        mut estimates: Vec<SubscriptionEstimate>,
        mut failures: Vec<JobFailure>,
        parameters: RunParameters,
        pricing: &PricingSnapshot,
        include_management_groups: bool,
        top_n: usize,
    ) -> CostReport {
        sort_estimates(&mut estimates);
        failures.sort_by(|a, b| a.subscription_id.cmp(&b.subscription_id));

        let mut cost_breakdown = CostBreakdown::default();
        for estimate in &estimates {
            cost_breakdown.add(&estimate.costs);
        }

        CostReport {
            generated_at: Utc::now(),
            parameters,
            pricing: PricingProvenance::from(pricing),
            grand_total: grand_total(&estimates),
            cost_breakdown,
            by_business_unit: group_by(&estimates, GroupKey::BusinessUnit),
            by_management_group: include_management_groups
                .then(|| group_by(&estimates, GroupKey::ManagementGroup)),
            by_environment: group_by(&estimates, GroupKey::Environment),
            by_region: group_by(&estimates, GroupKey::Region),
            top_subscriptions: top_subscriptions(&estimates, top_n),
            subscriptions: estimates,
            failures,
        }
    }

    /// Every grouping that was produced, with its dimension
    pub fn groupings(&self) -> Vec<(GroupKey, &[GroupSummary])> {
        let mut groupings: Vec<(GroupKey, &[GroupSummary])> = vec![
            (GroupKey::BusinessUnit, self.by_business_unit.as_slice()),
            (GroupKey::Environment, self.by_environment.as_slice()),
            (GroupKey::Region, self.by_region.as_slice()),
        ];
        if let Some(groups) = &self.by_management_group {
            groupings.insert(1, (GroupKey::ManagementGroup, groups.as_slice()));
        }
        groupings
    }

    /// Load a report previously written as the JSON summary
    pub fn load(path: &Path) -> Result<CostReport> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
