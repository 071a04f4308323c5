use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration, loaded from TOML and frozen before a run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub azure: AzureConfig,
    pub sampling: SamplingConfig,
    pub estimation: EstimationConfig,
    pub pricing: PricingConfig,
    pub classification: ClassificationConfig,
    pub output: OutputConfig,
    pub execution: ExecutionConfig,
}

/// Endpoints and API versions of the upstream services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AzureConfig {
    pub management_endpoint: String,
    pub login_endpoint: String,
    pub pricing_endpoint: String,
    pub subscriptions_api_version: String,
    pub resources_api_version: String,
    pub activity_log_api_version: String,
    pub management_groups_api_version: String,
    pub request_timeout_secs: u64,
}

/// How activity logs are sampled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Size of the look-back window
    pub days_to_analyze: u32,
    /// Maximum number of log entries pulled per subscription
    pub sample_size: usize,
    /// Resource-count heuristic used when the log sample cannot be fetched
    pub events_per_resource_per_day: f64,
    pub min_fallback_daily_entries: f64,
}

/// Constants of the cost formula
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EstimationConfig {
    pub default_entry_size_kb: f64,
    pub hours_per_month: f64,
    pub days_per_month: f64,
    pub throughput_unit_mb_per_sec: f64,
    pub throughput_unit_events_per_sec: f64,
    pub min_throughput_units: u32,
    pub max_throughput_units: u32,
    pub instance_events_per_sec: f64,
    pub min_instances: u32,
    pub max_instances: u32,
    pub retention_days: f64,
    pub secret_store_monthly_operations: f64,
    pub private_endpoints: u32,
    pub gateways: u32,
    pub additional_fixed_monthly: f64,
}

/// Where unit prices come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    /// Azure Retail Prices API, cached on disk
    Real,
    /// Built-in table
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    pub mode: PricingMode,
    /// Defaults to ~/.azcost/pricing_cache.json
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
    pub cache_ttl_hours: i64,
    pub default_region: String,
    pub currency: String,
    pub meters: MeterFilters,
    /// Ignore a fresh cache and fetch again (CLI only)
    #[serde(skip)]
    pub force_refresh: bool,
}

/// Retail Prices API filter for one meter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeterFilter {
    pub service_name: String,
    pub meter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeterFilters {
    pub throughput_unit: MeterFilter,
    pub storage: MeterFilter,
    pub compute_instance: MeterFilter,
    pub secret_operations: MeterFilter,
    pub private_endpoint: MeterFilter,
    pub gateway: MeterFilter,
}

/// A named category matched by tag value or display-name substring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationRule {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default)]
    pub tag_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassificationConfig {
    pub environment_tag: String,
    pub default_environment: String,
    pub environments: Vec<ClassificationRule>,
    pub business_unit_tag: String,
    pub default_business_unit: String,
    pub business_units: Vec<ClassificationRule>,
    pub default_management_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub subscription_csv: String,
    pub business_unit_csv: String,
    pub management_group_csv: String,
    pub region_csv: String,
    pub json_summary: String,
    pub html_report: String,
    pub status_file: String,
    /// Relative to `directory` unless absolute; empty disables the file log
    pub log_file: String,
    pub include_charts: bool,
    pub include_management_groups: bool,
    pub top_subscriptions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub parallel: bool,
    pub max_parallel_jobs: usize,
}

impl OutputConfig {
    /// Resolve a configured output file name against the output directory
    pub fn path_for(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        if path.is_absolute() {
            path
        } else {
            self.directory.join(path)
        }
    }
}

impl ExecutionConfig {
    /// Number of workers the pool runs with
    pub fn worker_count(&self) -> usize {
        if self.parallel {
            self.max_parallel_jobs.max(1)
        } else {
            1
        }
    }
}
