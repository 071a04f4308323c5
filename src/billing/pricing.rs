use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::retail;
use super::{PricingSnapshot, PricingSource, RegionPricing, DEFAULT_PRICING_ROW};
use crate::config::{Config, MeterFilters, PricingConfig};
use crate::core::region::normalize_region;
use crate::error::Result;

/// US East list prices, the basis of the built-in table
const BASE_PRICING: RegionPricing = RegionPricing {
    throughput_unit_hour: 0.03,
    storage_gb_month: 0.0184,
    compute_instance_hour: 0.173,
    secret_ops_per_10k: 0.03,
    private_endpoint_hour: 0.01,
    gateway_hour: 0.045,
};

/// Regional price level relative to US East
const REGION_FACTORS: [(&str, f64); 16] = [
    ("eastus", 1.0),
    ("eastus2", 1.0),
    ("centralus", 1.0),
    ("westus2", 1.0),
    ("westus3", 1.0),
    ("westus", 1.05),
    ("canadacentral", 1.05),
    ("northeurope", 1.05),
    ("westeurope", 1.1),
    ("uksouth", 1.1),
    ("germanywestcentral", 1.1),
    ("southeastasia", 1.15),
    ("japaneast", 1.2),
    ("australiaeast", 1.2),
    ("centralindia", 1.1),
    ("brazilsouth", 1.35),
];

static STATIC_PRICING: Lazy<PricingSnapshot> = Lazy::new(|| PricingSnapshot {
    source: PricingSource::Static,
    fetched_at: DateTime::<Utc>::default(),
    currency: "USD".to_string(),
    query_key: String::new(),
    default: BASE_PRICING,
    regions: REGION_FACTORS
        .iter()
        .map(|(region, factor)| (region.to_string(), BASE_PRICING.scaled(*factor)))
        .collect(),
});

#[derive(Serialize)]
struct QueryKey<'a> {
    default_region: String,
    meters: &'a MeterFilters,
}

/// Stable description of the retail queries behind a snapshot
pub fn query_key(pricing: &PricingConfig) -> String {
    let key = QueryKey {
        default_region: normalize_region(&pricing.default_region),
        meters: &pricing.meters,
    };
    serde_json::to_string(&key).unwrap_or_default()
}

impl PricingSnapshot {
    /// Built-in table used in static mode and as the last-resort fallback
    pub fn static_table() -> PricingSnapshot {
        STATIC_PRICING.clone()
    }

    /// Prices for `region`, falling back to the default row
    pub fn lookup(&self, region: &str) -> &RegionPricing {
        self.find(region).unwrap_or(&self.default)
    }

    /// Prices for `region` without the fallback
    pub fn find(&self, region: &str) -> Option<&RegionPricing> {
        let normalized = normalize_region(region);
        if normalized == DEFAULT_PRICING_ROW {
            return Some(&self.default);
        }
        self.regions.get(&normalized)
    }

    /// Whether the snapshot was fetched with the currency, meters and
    /// default region configured in `pricing`
    pub fn answers(&self, pricing: &PricingConfig) -> bool {
        self.currency == pricing.currency && self.query_key == query_key(pricing)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl_hours: i64) -> bool {
        now - self.fetched_at < Duration::hours(ttl_hours)
    }

    /// Load a cached snapshot, `None` if the file does not exist
    pub fn load_cache(path: &Path) -> Result<Option<PricingSnapshot>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let snapshot: PricingSnapshot = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }

    pub fn save_cache(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build a snapshot from fetched per-region meter prices.
    /// Missing meters inherit from `default`, itself the static base
    /// overlaid with whatever was fetched for `default_region`.
    pub fn from_fetched(
        fetched: BTreeMap<String, BTreeMap<super::Meter, f64>>,
        default_region: &str,
        currency: &str,
        fetched_at: DateTime<Utc>,
    ) -> PricingSnapshot {
        let mut default = STATIC_PRICING.default;
        if let Some(prices) = fetched.get(&normalize_region(default_region)) {
            for (meter, price) in prices {
                default.set(*meter, *price);
            }
        }

        let regions = fetched
            .into_iter()
            .map(|(region, prices)| {
                let mut row = default;
                for (meter, price) in prices {
                    row.set(meter, price);
                }
                (region, row)
            })
            .collect();

        PricingSnapshot {
            source: PricingSource::Retail,
            fetched_at,
            currency: currency.to_string(),
            query_key: String::new(),
            default,
            regions,
        }
    }
}

/// Resolve the pricing snapshot for a run. Never fails: a broken cache or
/// an unreachable pricing API degrades to a stale cache, then the static table.
pub async fn resolve_pricing(config: &Config, http: &reqwest::Client) -> PricingSnapshot {
    use crate::config::PricingMode;

    if config.pricing.mode == PricingMode::Static {
        tracing::info!("Using built-in static pricing table");
        return PricingSnapshot::static_table();
    }

    let cache_path = config.pricing_cache_path();
    let cached = match PricingSnapshot::load_cache(&cache_path) {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!(path = %cache_path.display(), error = %e, "Ignoring unreadable pricing cache");
            None
        }
    };

    let cached = cached.filter(|snapshot| {
        let matches = snapshot.answers(&config.pricing);
        if !matches {
            tracing::info!(
                cached_currency = %snapshot.currency,
                currency = %config.pricing.currency,
                "Pricing cache was fetched with other settings, discarding it"
            );
        }
        matches
    });

    if let Some(snapshot) = &cached {
        if !config.pricing.force_refresh
            && snapshot.is_fresh(Utc::now(), config.pricing.cache_ttl_hours)
        {
            tracing::info!(
                fetched_at = %snapshot.fetched_at,
                regions = snapshot.regions.len(),
                "Using cached retail pricing"
            );
            let mut snapshot = snapshot.clone();
            snapshot.source = PricingSource::Cache;
            return snapshot;
        }
        tracing::info!(fetched_at = %snapshot.fetched_at, "Pricing cache is outdated, refreshing");
    }

    match retail::fetch_snapshot(http, config).await {
        Ok(snapshot) => {
            if let Err(e) = snapshot.save_cache(&cache_path) {
                tracing::warn!(path = %cache_path.display(), error = %e, "Failed to write pricing cache");
            }
            snapshot
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch retail pricing");
            match cached {
                Some(mut stale) => {
                    tracing::warn!(fetched_at = %stale.fetched_at, "Falling back to outdated pricing cache");
                    stale.source = PricingSource::Cache;
                    stale
                }
                None => {
                    tracing::warn!("Falling back to built-in static pricing table");
                    PricingSnapshot::static_table()
                }
            }
        }
    }
}
