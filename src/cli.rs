use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, PricingMode};

#[derive(Parser, Debug, Default)]
#[command(name = "azcost")]
#[command(version, about = "Estimate Azure log-ingestion costs per subscription and business unit")]
pub struct Cli {
    /// Alternate config file (default: ~/.azcost/config.toml)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print current configuration
    #[arg(long = "print")]
    pub print: bool,

    /// Initialize config file
    #[arg(long = "init")]
    pub init: bool,

    /// Check configuration
    #[arg(long = "check")]
    pub check: bool,

    /// Days of activity log to analyze
    #[arg(long = "days", value_name = "N")]
    pub days: Option<u32>,

    /// Restrict the run to one subscription
    #[arg(long = "subscription-id", value_name = "ID")]
    pub subscription_id: Option<String>,

    /// Read subscriptions from a JSON/JSONL inventory instead of Azure
    #[arg(long = "inventory", value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// Output directory
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long = "subscription-csv", value_name = "FILE")]
    pub subscription_csv: Option<String>,

    #[arg(long = "business-unit-csv", value_name = "FILE")]
    pub business_unit_csv: Option<String>,

    #[arg(long = "management-group-csv", value_name = "FILE")]
    pub management_group_csv: Option<String>,

    #[arg(long = "region-csv", value_name = "FILE")]
    pub region_csv: Option<String>,

    /// JSON summary file
    #[arg(long = "json-output", value_name = "FILE")]
    pub json_output: Option<String>,

    /// HTML report file
    #[arg(long = "html-output", value_name = "FILE")]
    pub html_output: Option<String>,

    /// Log file; an empty value disables file logging
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<String>,

    /// Progress snapshot file
    #[arg(long = "status-file", value_name = "FILE")]
    pub status_file: Option<String>,

    /// Max activity-log entries sampled per subscription
    #[arg(long = "sample-size", value_name = "N")]
    pub sample_size: Option<usize>,

    /// Retail Prices API (cached) or the built-in table
    #[arg(long = "pricing-mode", value_enum)]
    pub pricing_mode: Option<PricingMode>,

    /// Ignore a fresh pricing cache and fetch again
    #[arg(long = "refresh-pricing")]
    pub refresh_pricing: bool,

    /// Process subscriptions with a worker pool
    #[arg(long = "parallel")]
    pub parallel: bool,

    #[arg(long = "max-parallel-jobs", value_name = "N")]
    pub max_parallel_jobs: Option<usize>,

    /// Tag key carrying the business unit
    #[arg(long = "business-unit-tag", value_name = "TAG")]
    pub business_unit_tag: Option<String>,

    /// Resolve and aggregate management groups
    #[arg(long = "include-management-groups")]
    pub include_management_groups: bool,

    /// Inline SVG charts in the HTML report
    #[arg(long = "include-charts", value_name = "BOOL")]
    pub include_charts: Option<bool>,

    /// Debug-level logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Layer command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(days) = self.days {
            config.sampling.days_to_analyze = days;
        }
        if let Some(sample_size) = self.sample_size {
            config.sampling.sample_size = sample_size;
        }

        let output = &mut config.output;
        if let Some(dir) = &self.output_dir {
            output.directory = dir.clone();
        }
        for (value, target) in [
            (&self.subscription_csv, &mut output.subscription_csv),
            (&self.business_unit_csv, &mut output.business_unit_csv),
            (&self.management_group_csv, &mut output.management_group_csv),
            (&self.region_csv, &mut output.region_csv),
            (&self.json_output, &mut output.json_summary),
            (&self.html_output, &mut output.html_report),
            (&self.log_file, &mut output.log_file),
            (&self.status_file, &mut output.status_file),
        ] {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        if self.include_management_groups {
            output.include_management_groups = true;
        }
        if let Some(include_charts) = self.include_charts {
            output.include_charts = include_charts;
        }

        if let Some(mode) = self.pricing_mode {
            config.pricing.mode = mode;
        }
        if self.refresh_pricing {
            config.pricing.force_refresh = true;
        }

        if self.parallel {
            config.execution.parallel = true;
        }
        if let Some(jobs) = self.max_parallel_jobs {
            config.execution.max_parallel_jobs = jobs;
        }

        if let Some(tag) = &self.business_unit_tag {
            config.classification.business_unit_tag = tag.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "azcost",
            "--days",
            "3",
            "--sample-size",
            "50",
            "--output-dir",
            "out",
            "--json-output",
            "run.json",
            "--pricing-mode",
            "static",
            "--refresh-pricing",
            "--parallel",
            "--max-parallel-jobs",
            "8",
            "--business-unit-tag",
            "CostCenter",
            "--include-management-groups",
            "--include-charts",
            "false",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.sampling.days_to_analyze, 3);
        assert_eq!(config.sampling.sample_size, 50);
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.output.json_summary, "run.json");
        assert_eq!(config.output.html_report, "cost_report.html");
        assert_eq!(config.pricing.mode, PricingMode::Static);
        assert!(config.pricing.force_refresh);
        assert_eq!(config.execution.worker_count(), 8);
        assert_eq!(config.classification.business_unit_tag, "CostCenter");
        assert!(config.output.include_management_groups);
        assert!(!config.output.include_charts);
    }

    #[test]
    fn test_no_flags_leave_config_untouched() {
        let cli = Cli::parse_from(["azcost"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
