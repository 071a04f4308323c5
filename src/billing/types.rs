use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the fallback row in a pricing snapshot
pub const DEFAULT_PRICING_ROW: &str = "default";

/// Unit prices for one region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionPricing {
    /// Event-streaming throughput unit, per hour
    pub throughput_unit_hour: f64,
    /// Log storage, per GB-month
    pub storage_gb_month: f64,
    /// Compute instance, per hour
    pub compute_instance_hour: f64,
    /// Secret store, per 10,000 operations
    pub secret_ops_per_10k: f64,
    /// Private endpoint, per hour
    pub private_endpoint_hour: f64,
    /// Gateway, per hour
    pub gateway_hour: f64,
}

/// One of the priced meters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Meter {
    ThroughputUnit,
    Storage,
    ComputeInstance,
    SecretOperations,
    PrivateEndpoint,
    Gateway,
}

impl Meter {
    pub const ALL: [Meter; 6] = [
        Meter::ThroughputUnit,
        Meter::Storage,
        Meter::ComputeInstance,
        Meter::SecretOperations,
        Meter::PrivateEndpoint,
        Meter::Gateway,
    ];
}

impl RegionPricing {
    pub fn get(&self, meter: Meter) -> f64 {
        match meter {
            Meter::ThroughputUnit => self.throughput_unit_hour,
            Meter::Storage => self.storage_gb_month,
            Meter::ComputeInstance => self.compute_instance_hour,
            Meter::SecretOperations => self.secret_ops_per_10k,
            Meter::PrivateEndpoint => self.private_endpoint_hour,
            Meter::Gateway => self.gateway_hour,
        }
    }

    pub fn set(&mut self, meter: Meter, price: f64) {
        match meter {
            Meter::ThroughputUnit => self.throughput_unit_hour = price,
            Meter::Storage => self.storage_gb_month = price,
            Meter::ComputeInstance => self.compute_instance_hour = price,
            Meter::SecretOperations => self.secret_ops_per_10k = price,
            Meter::PrivateEndpoint => self.private_endpoint_hour = price,
            Meter::Gateway => self.gateway_hour = price,
        }
    }

    /// Scale every price, used to derive regional rows in the built-in table
    pub fn scaled(&self, factor: f64) -> Self {
        let mut scaled = *self;
        for meter in Meter::ALL {
            scaled.set(meter, self.get(meter) * factor);
        }
        scaled
    }
}

/// Where a pricing snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    Static,
    Retail,
    Cache,
}

impl std::fmt::Display for PricingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingSource::Static => write!(f, "static"),
            PricingSource::Retail => write!(f, "retail"),
            PricingSource::Cache => write!(f, "cache"),
        }
    }
}

/// Unit prices indexed by normalized region name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub source: PricingSource,
    pub fetched_at: DateTime<Utc>,
    pub currency: String,
    /// Retail query settings the prices were fetched with, empty for the static table
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query_key: String,
    pub default: RegionPricing,
    pub regions: BTreeMap<String, RegionPricing>,
}

/// Monthly cost split into its named components
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub event_streaming: f64,
    pub storage: f64,
    pub compute: f64,
    pub secret_store: f64,
    pub private_networking: f64,
    pub fixed_overhead: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.event_streaming
            + self.storage
            + self.compute
            + self.secret_store
            + self.private_networking
            + self.fixed_overhead
    }

    /// Component names and values, in report order
    pub fn components(&self) -> [(&'static str, f64); 6] {
        [
            ("Event Streaming", self.event_streaming),
            ("Storage", self.storage),
            ("Compute", self.compute),
            ("Secret Store", self.secret_store),
            ("Private Networking", self.private_networking),
            ("Fixed Overhead", self.fixed_overhead),
        ]
    }

    pub fn add(&mut self, other: &CostBreakdown) {
        self.event_streaming += other.event_streaming;
        self.storage += other.storage;
        self.compute += other.compute;
        self.secret_store += other.secret_store;
        self.private_networking += other.private_networking;
        self.fixed_overhead += other.fixed_overhead;
    }
}

/// Sampled and extrapolated activity-log metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LogMetrics {
    pub sampled_entries: u64,
    pub average_entry_bytes: f64,
    pub daily_entries: f64,
    pub daily_volume_gb: f64,
    pub monthly_volume_gb: f64,
    pub events_per_second: f64,
}

/// Capacity derived from the log metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub throughput_units: u32,
    pub compute_instances: u32,
}

/// How a label was assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Tag,
    Name,
    Default,
}

/// Cost estimate for one subscription, immutable once computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEstimate {
    pub subscription_id: String,
    pub subscription_name: String,
    pub region: String,
    pub environment: String,
    pub environment_source: MatchSource,
    pub business_unit: String,
    pub business_unit_source: MatchSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_group: Option<String>,
    pub logs: LogMetrics,
    pub resource_count: u64,
    #[serde(default)]
    pub resources_by_type: BTreeMap<String, u64>,
    pub capacity: CapacityPlan,
    pub costs: CostBreakdown,
    pub monthly_cost: f64,
    /// Fallbacks applied while producing this estimate
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A subscription whose job failed outright
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub subscription_id: String,
    pub subscription_name: String,
    pub error: String,
}
