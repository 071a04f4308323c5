use super::types::{
    AzureConfig, ClassificationConfig, ClassificationRule, EstimationConfig, ExecutionConfig,
    MeterFilter, MeterFilters, OutputConfig, PricingConfig, PricingMode, SamplingConfig,
};
use std::path::PathBuf;

pub const DEFAULT_REGION: &str = "eastus";
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
pub const DEFAULT_PRICING_ENDPOINT: &str = "https://prices.azure.com";

impl Default for AzureConfig {
    fn default() -> Self {
        AzureConfig {
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            login_endpoint: DEFAULT_LOGIN_ENDPOINT.to_string(),
            pricing_endpoint: DEFAULT_PRICING_ENDPOINT.to_string(),
            subscriptions_api_version: "2022-12-01".to_string(),
            resources_api_version: "2021-04-01".to_string(),
            activity_log_api_version: "2015-04-01".to_string(),
            management_groups_api_version: "2020-05-01".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            days_to_analyze: 7,
            sample_size: 1000,
            // ~5,000 events per resource per month
            events_per_resource_per_day: 5000.0 / 30.0,
            min_fallback_daily_entries: 100_000.0 / 30.0,
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        EstimationConfig {
            default_entry_size_kb: 1.5,
            hours_per_month: 730.0,
            days_per_month: 30.0,
            throughput_unit_mb_per_sec: 1.0,
            throughput_unit_events_per_sec: 1000.0,
            min_throughput_units: 1,
            max_throughput_units: 20,
            instance_events_per_sec: 250.0,
            min_instances: 1,
            max_instances: 10,
            retention_days: 30.0,
            secret_store_monthly_operations: 100_000.0,
            private_endpoints: 4,
            gateways: 1,
            additional_fixed_monthly: 0.0,
        }
    }
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::Real
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            mode: PricingMode::default(),
            cache_file: None,
            cache_ttl_hours: 24,
            default_region: DEFAULT_REGION.to_string(),
            currency: "USD".to_string(),
            meters: MeterFilters::default(),
            force_refresh: false,
        }
    }
}

fn meter(service_name: &str, meter_name: &str) -> MeterFilter {
    MeterFilter {
        service_name: service_name.to_string(),
        meter_name: meter_name.to_string(),
        product_name: None,
        sku_name: None,
    }
}

impl Default for MeterFilters {
    fn default() -> Self {
        MeterFilters {
            throughput_unit: meter("Event Hubs", "Standard Throughput Unit"),
            storage: MeterFilter {
                product_name: Some("General Block Blob v2".to_string()),
                ..meter("Storage", "Hot LRS Data Stored")
            },
            compute_instance: MeterFilter {
                product_name: Some("Functions".to_string()),
                ..meter("Functions", "EP1 vCPU Duration")
            },
            secret_operations: MeterFilter {
                sku_name: Some("Standard".to_string()),
                ..meter("Key Vault", "Operations")
            },
            private_endpoint: meter("Virtual Network", "Standard Private Endpoint"),
            gateway: meter("NAT Gateway", "Standard Gateway"),
        }
    }
}

fn rule(name: &str, priority: i32, name_patterns: &[&str], tag_values: &[&str]) -> ClassificationRule {
    ClassificationRule {
        name: name.to_string(),
        priority,
        name_patterns: name_patterns.iter().map(|s| s.to_string()).collect(),
        tag_values: tag_values.iter().map(|s| s.to_string()).collect(),
    }
}

/// Built-in environment categories. `PreProduction` outranks `Production`
/// so names like "preprod" land in the right bucket.
pub fn default_environment_rules() -> Vec<ClassificationRule> {
    vec![
        rule(
            "PreProduction",
            110,
            &["preprod", "pre-prod", "staging", "stg", "uat"],
            &["PreProduction", "Preprod", "Staging", "UAT"],
        ),
        rule(
            "Production",
            100,
            &["prod", "prd", "live"],
            &["Production", "Prod", "PROD", "prod", "production", "PRD"],
        ),
        rule(
            "Test",
            60,
            &["test", "tst", "qa"],
            &["Test", "QA", "test", "qa"],
        ),
        rule(
            "Development",
            50,
            &["dev", "sandbox", "sbx"],
            &["Development", "Dev", "dev", "Sandbox"],
        ),
        rule(
            "Shared",
            40,
            &["shared", "hub", "connectivity", "identity", "management"],
            &["Shared", "Platform"],
        ),
    ]
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        ClassificationConfig {
            environment_tag: "Environment".to_string(),
            default_environment: "Unclassified".to_string(),
            environments: default_environment_rules(),
            business_unit_tag: "BusinessUnit".to_string(),
            default_business_unit: "Unassigned".to_string(),
            business_units: Vec::new(),
            default_management_group: "Unassigned".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: PathBuf::from("azcost-reports"),
            subscription_csv: "subscription_costs.csv".to_string(),
            business_unit_csv: "business_unit_costs.csv".to_string(),
            management_group_csv: "management_group_costs.csv".to_string(),
            region_csv: "region_costs.csv".to_string(),
            json_summary: "cost_summary.json".to_string(),
            html_report: "cost_report.html".to_string(),
            status_file: "status.json".to_string(),
            log_file: "azcost.log".to_string(),
            include_charts: true,
            include_management_groups: false,
            top_subscriptions: 10,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            parallel: false,
            max_parallel_jobs: 4,
        }
    }
}
