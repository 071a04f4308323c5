use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::classify::Classifier;
use super::pool::{JobEvent, WorkerPool};
use super::source::{DataSource, SubscriptionData};
use super::status::StatusTracker;
use crate::azure::{ResourceInventory, Subscription};
use crate::billing::calculator::{self, format_currency, EstimateInputs};
use crate::billing::{
    CostReport, JobFailure, PricingSnapshot, RunParameters, SubscriptionEstimate,
};
use crate::config::Config;
use crate::core::region::normalize_region;
use crate::error::Result;

/// Per-run options that are not part of the configuration file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub subscription_id: Option<String>,
    pub inventory: Option<PathBuf>,
}

/// Immutable state shared by every job of a run
#[derive(Debug)]
pub struct JobContext {
    pub config: Arc<Config>,
    pub pricing: Arc<PricingSnapshot>,
    pub source: Arc<DataSource>,
    pub environments: Classifier,
    pub business_units: Classifier,
    pub now: DateTime<Utc>,
}

impl JobContext {
    pub fn new(config: Arc<Config>, pricing: Arc<PricingSnapshot>, source: Arc<DataSource>) -> Self {
        let environments = Classifier::environments(&config.classification);
        let business_units = Classifier::business_units(&config.classification);
        Self {
            config,
            pricing,
            source,
            environments,
            business_units,
            now: Utc::now(),
        }
    }
}

/// Turn fetched data into an estimate. Missing inputs fall back to
/// defaults and leave a note instead of failing.
pub fn build_estimate(
    ctx: &JobContext,
    subscription: &Subscription,
    data: SubscriptionData,
) -> SubscriptionEstimate {
    let config = &ctx.config;
    let name = subscription.name();
    let mut notes = Vec::new();

    let inventory = match data.resources {
        Ok(inventory) => inventory,
        Err(e) => {
            tracing::warn!(subscription = name, error = %e, "Resource inventory unavailable");
            notes.push(format!("resource inventory unavailable: {}", e));
            ResourceInventory::default()
        }
    };

    let sample = match data.activity {
        Ok(sample) => Some(sample),
        Err(e) => {
            tracing::warn!(subscription = name, error = %e, "Activity log unavailable");
            notes.push(format!(
                "activity log unavailable ({}), volume estimated from {} resources",
                e, inventory.total
            ));
            None
        }
    };

    let region = match inventory.primary_region() {
        Some(region) => region,
        None => {
            let fallback = normalize_region(&config.pricing.default_region);
            notes.push(format!("no regional resources, assumed region {}", fallback));
            fallback
        }
    };

    let prices = match ctx.pricing.find(&region) {
        Some(prices) => prices,
        None => {
            notes.push(format!("no prices for region {}, used default prices", region));
            &ctx.pricing.default
        }
    };

    let environment = ctx.environments.classify(name, &subscription.tags);
    let business_unit = ctx.business_units.classify(name, &subscription.tags);

    let management_group = if config.output.include_management_groups {
        Some(data.management_group.unwrap_or_else(|| {
            notes.push("management group unknown".to_string());
            config.classification.default_management_group.clone()
        }))
    } else {
        None
    };

    let inputs = EstimateInputs {
        sample,
        resource_count: inventory.total,
    };
    let (logs, capacity, costs) =
        calculator::estimate(&inputs, prices, &config.sampling, &config.estimation);

    SubscriptionEstimate {
        subscription_id: subscription.subscription_id.clone(),
        subscription_name: name.to_string(),
        region,
        environment: environment.label,
        environment_source: environment.source,
        business_unit: business_unit.label,
        business_unit_source: business_unit.source,
        management_group,
        logs,
        resource_count: inventory.total,
        resources_by_type: inventory.by_type,
        capacity,
        monthly_cost: costs.total(),
        costs,
        notes,
    }
}

/// Fetch and estimate one subscription
pub async fn process_subscription(ctx: &JobContext, subscription: Subscription) -> SubscriptionEstimate {
    let data = ctx.source.fetch(&subscription, &ctx.config, ctx.now).await;
    let estimate = build_estimate(ctx, &subscription, data);
    tracing::info!(
        subscription = %estimate.subscription_name,
        region = %estimate.region,
        environment = %estimate.environment,
        business_unit = %estimate.business_unit,
        cost = %format_currency(estimate.monthly_cost),
        "Estimated subscription"
    );
    estimate
}

/// Estimate every subscription of `source` and assemble the report.
/// Only subscription enumeration can fail the run.
pub async fn run(
    config: Arc<Config>,
    source: DataSource,
    pricing: PricingSnapshot,
    options: &RunOptions,
    status: &mut StatusTracker,
) -> Result<CostReport> {
    let source = Arc::new(source);
    let pricing = Arc::new(pricing);

    status.phase(super::status::Phase::Enumerating);
    let subscriptions = source.subscriptions(options.subscription_id.as_deref()).await?;
    tracing::info!(
        source = source.kind(),
        subscriptions = subscriptions.len(),
        "Estimating subscriptions"
    );

    let names: BTreeMap<String, String> = subscriptions
        .iter()
        .map(|s| (s.subscription_id.clone(), s.name().to_string()))
        .collect();
    let jobs: Vec<(String, Subscription)> = subscriptions
        .into_iter()
        .map(|s| (s.subscription_id.clone(), s))
        .collect();

    let pool = WorkerPool::new(config.execution.worker_count());
    let ctx = Arc::new(JobContext::new(
        Arc::clone(&config),
        Arc::clone(&pricing),
        Arc::clone(&source),
    ));

    status.begin_jobs(jobs.len());
    let mut events = pool.spawn(jobs, move |subscription| {
        let ctx = Arc::clone(&ctx);
        async move { Ok(process_subscription(&ctx, subscription).await) }
    });

    let mut estimates = Vec::new();
    let mut failures = Vec::new();
    let name_of = |key: &str| names.get(key).cloned().unwrap_or_else(|| key.to_string());

    while let Some(event) = events.recv().await {
        match event {
            JobEvent::Started { key } => status.started(&name_of(&key)),
            JobEvent::Completed { result, .. } => {
                estimates.push(result);
                status.finished(true);
            }
            JobEvent::Failed { key, error } => {
                let subscription_name = name_of(&key);
                tracing::error!(subscription = %subscription_name, error = %error, "Subscription job failed");
                failures.push(JobFailure {
                    subscription_id: key,
                    subscription_name,
                    error,
                });
                status.finished(false);
            }
        }
    }

    let parameters = RunParameters {
        days_to_analyze: config.sampling.days_to_analyze,
        sample_size: config.sampling.sample_size,
        pricing_mode: config.pricing.mode,
        workers: pool.workers(),
        subscription_filter: options.subscription_id.clone(),
        inventory: options
            .inventory
            .as_ref()
            .map(|path| path.display().to_string()),
    };

    Ok(CostReport::build(
        estimates,
        failures,
        parameters,
        &pricing,
        config.output.include_management_groups,
        config.output.top_subscriptions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::calculator::ActivitySample;
    use crate::billing::MatchSource;
    use crate::error::EstimatorError;
    use crate::utils::inventory::{InventoryRecord, RecordedActivity};

    fn subscription(id: &str, name: &str, tags: &[(&str, &str)]) -> Subscription {
        Subscription {
            subscription_id: id.to_string(),
            display_name: name.to_string(),
            state: "Enabled".to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn context(config: Config) -> JobContext {
        JobContext::new(
            Arc::new(config),
            Arc::new(PricingSnapshot::static_table()),
            Arc::new(DataSource::inventory(Vec::new())),
        )
    }

    fn inventory(location: &str, count: u64) -> ResourceInventory {
        let mut inventory = ResourceInventory::default();
        for _ in 0..count {
            inventory.record("Microsoft.Web/sites", location);
        }
        inventory
    }

    #[test]
    fn test_build_estimate_happy_path() {
        let ctx = context(Config::default());
        let data = SubscriptionData {
            activity: Ok(ActivitySample {
                sampled_entries: 700,
                sampled_bytes: 700 * 1536,
                covered_days: 7.0,
            }),
            resources: Ok(inventory("West Europe", 3)),
            management_group: None,
        };

        let sub = subscription("s1", "payments-prod", &[("BusinessUnit", "Finance")]);
        let estimate = build_estimate(&ctx, &sub, data);

        assert_eq!(estimate.region, "westeurope");
        assert_eq!(estimate.environment, "Production");
        assert_eq!(estimate.environment_source, MatchSource::Name);
        assert_eq!(estimate.business_unit, "Finance");
        assert_eq!(estimate.business_unit_source, MatchSource::Tag);
        assert!(estimate.management_group.is_none());
        assert!(estimate.notes.is_empty());
        assert_eq!(estimate.logs.daily_entries, 100.0);
        assert!((estimate.monthly_cost - estimate.costs.total()).abs() < 1e-12);
    }

    #[test]
    fn test_build_estimate_records_fallbacks() {
        let mut config = Config::default();
        config.output.include_management_groups = true;
        let ctx = context(config);

        let data = SubscriptionData {
            activity: Err(EstimatorError::Config("forbidden".to_string())),
            resources: Ok(inventory("marsnorth", 30)),
            management_group: None,
        };
        let estimate = build_estimate(&ctx, &subscription("s2", "misc", &[]), data);

        assert_eq!(estimate.region, "marsnorth");
        assert_eq!(estimate.management_group.as_deref(), Some("Unassigned"));
        assert_eq!(estimate.notes.len(), 3);
        assert_eq!(estimate.logs.sampled_entries, 0);
        // 30 resources * 5000/30 per day
        assert!((estimate.logs.daily_entries - 5000.0).abs() < 1e-9);
        assert_eq!(estimate.environment_source, MatchSource::Default);
        assert_eq!(estimate.business_unit, "Unassigned");
    }

    #[test]
    fn test_build_estimate_without_resources_uses_default_region() {
        let ctx = context(Config::default());
        let data = SubscriptionData {
            activity: Ok(ActivitySample::default()),
            resources: Err(EstimatorError::Config("throttled".to_string())),
            management_group: None,
        };
        let estimate = build_estimate(&ctx, &subscription("s3", "", &[]), data);
        assert_eq!(estimate.subscription_name, "s3");
        assert_eq!(estimate.region, "eastus");
        assert_eq!(estimate.notes.len(), 2);
        assert_eq!(estimate.logs.average_entry_bytes, 1.5 * 1024.0);
    }

    fn record(id: &str, name: &str, bu: &str, entries: u64) -> InventoryRecord {
        InventoryRecord {
            subscription: subscription(id, name, &[("BusinessUnit", bu)]),
            management_group: None,
            activity: Some(RecordedActivity {
                sampled_entries: entries,
                sampled_bytes: entries * 1024,
                covered_days: 7.0,
            }),
            resources: inventory("eastus", 2),
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let records = vec![
            record("a", "fin-prod", "Finance", 7_000),
            record("b", "fin-dev", "Finance", 70),
            record("c", "ops-prod", "Ops", 700_000),
        ];

        let run_with = |parallel: bool| {
            let mut config = Config::default();
            config.execution.parallel = parallel;
            config.execution.max_parallel_jobs = 3;
            let source = DataSource::inventory(records.clone());
            let mut status = StatusTracker::new(None);
            crate::utils::block_on(run(
                Arc::new(config),
                source,
                PricingSnapshot::static_table(),
                &RunOptions::default(),
                &mut status,
            ))
            .unwrap()
        };

        let sequential = run_with(false);
        let parallel = run_with(true);

        assert_eq!(sequential.parameters.workers, 1);
        assert_eq!(parallel.parameters.workers, 3);
        assert_eq!(sequential.subscriptions, parallel.subscriptions);
        assert_eq!(sequential.by_business_unit, parallel.by_business_unit);
        assert_eq!(sequential.subscriptions.len(), 3);
        assert!(sequential.failures.is_empty());
    }
}
