use crate::billing::{CapacityPlan, CostBreakdown, LogMetrics, RegionPricing};
use crate::config::{EstimationConfig, SamplingConfig};

const BYTES_PER_KB: f64 = 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Raw activity-log sample for one subscription
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivitySample {
    pub sampled_entries: u64,
    pub sampled_bytes: u64,
    /// Days of activity the sample spans
    pub covered_days: f64,
}

/// Everything the cost formula needs besides prices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateInputs {
    /// `None` when the sample could not be fetched
    pub sample: Option<ActivitySample>,
    pub resource_count: u64,
}

/// Derive log metrics from a sample, falling back to the resource-count heuristic
pub fn derive_log_metrics(
    inputs: &EstimateInputs,
    sampling: &SamplingConfig,
    estimation: &EstimationConfig,
) -> LogMetrics {
    let default_entry_bytes = estimation.default_entry_size_kb * BYTES_PER_KB;

    let (sampled_entries, average_entry_bytes, daily_entries) = match inputs.sample {
        Some(sample) => {
            let average = if sample.sampled_entries == 0 {
                default_entry_bytes
            } else {
                sample.sampled_bytes as f64 / sample.sampled_entries as f64
            };
            let daily = if sample.covered_days > 0.0 {
                sample.sampled_entries as f64 / sample.covered_days
            } else {
                sample.sampled_entries as f64
            };
            (sample.sampled_entries, average, daily)
        }
        None => (
            0,
            default_entry_bytes,
            resource_fallback_daily_entries(inputs.resource_count, sampling),
        ),
    };

    let daily_bytes = daily_entries * average_entry_bytes;

    LogMetrics {
        sampled_entries,
        average_entry_bytes,
        daily_entries,
        daily_volume_gb: daily_bytes / BYTES_PER_GB,
        monthly_volume_gb: daily_bytes * estimation.days_per_month / BYTES_PER_GB,
        events_per_second: daily_entries / SECONDS_PER_DAY,
    }
}

/// Daily entries implied by the resource count when no sample is available
pub fn resource_fallback_daily_entries(resource_count: u64, sampling: &SamplingConfig) -> f64 {
    (resource_count as f64 * sampling.events_per_resource_per_day)
        .max(sampling.min_fallback_daily_entries)
}

fn clamp_units(required: f64, min: u32, max: u32) -> u32 {
    let required = if required.is_finite() && required > 0.0 {
        required.ceil().min(u32::MAX as f64) as u32
    } else {
        0
    };
    required.clamp(min, max)
}

/// Throughput units and compute instances needed to carry the log stream
pub fn plan_capacity(logs: &LogMetrics, estimation: &EstimationConfig) -> CapacityPlan {
    let mb_per_sec = logs.daily_entries * logs.average_entry_bytes / SECONDS_PER_DAY / BYTES_PER_MB;
    let by_volume = mb_per_sec / estimation.throughput_unit_mb_per_sec;
    let by_events = logs.events_per_second / estimation.throughput_unit_events_per_sec;

    let throughput_units = clamp_units(
        by_volume.max(by_events),
        estimation.min_throughput_units,
        estimation.max_throughput_units,
    );
    let compute_instances = clamp_units(
        logs.events_per_second / estimation.instance_events_per_sec,
        estimation.min_instances,
        estimation.max_instances,
    );

    CapacityPlan {
        throughput_units,
        compute_instances,
    }
}

/// Monthly cost of a capacity plan at the given prices
pub fn calculate_costs(
    logs: &LogMetrics,
    capacity: &CapacityPlan,
    pricing: &RegionPricing,
    estimation: &EstimationConfig,
) -> CostBreakdown {
    let hours = estimation.hours_per_month;

    CostBreakdown {
        event_streaming: capacity.throughput_units as f64 * pricing.throughput_unit_hour * hours,
        storage: logs.daily_volume_gb * estimation.retention_days * pricing.storage_gb_month,
        compute: capacity.compute_instances as f64 * pricing.compute_instance_hour * hours,
        secret_store: estimation.secret_store_monthly_operations / 10_000.0
            * pricing.secret_ops_per_10k,
        private_networking: estimation.private_endpoints as f64
            * pricing.private_endpoint_hour
            * hours,
        fixed_overhead: estimation.gateways as f64 * pricing.gateway_hour * hours
            + estimation.additional_fixed_monthly,
    }
}

/// Full estimate: metrics, capacity and cost breakdown
pub fn estimate(
    inputs: &EstimateInputs,
    pricing: &RegionPricing,
    sampling: &SamplingConfig,
    estimation: &EstimationConfig,
) -> (LogMetrics, CapacityPlan, CostBreakdown) {
    let logs = derive_log_metrics(inputs, sampling, estimation);
    let capacity = plan_capacity(&logs, estimation);
    let costs = calculate_costs(&logs, &capacity, pricing, estimation);
    (logs, capacity, costs)
}

/// Format a monthly amount for console and report output
pub fn format_currency(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let whole = rounded.trunc() as i64;
    let cents = ((rounded - whole as f64).abs() * 100.0).round() as i64;

    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing() -> RegionPricing {
        RegionPricing {
            throughput_unit_hour: 0.03,
            storage_gb_month: 0.02,
            compute_instance_hour: 0.2,
            secret_ops_per_10k: 0.03,
            private_endpoint_hour: 0.01,
            gateway_hour: 0.045,
        }
    }

    #[test]
    fn test_zero_sample_uses_default_entry_size() {
        let inputs = EstimateInputs {
            sample: Some(ActivitySample {
                sampled_entries: 0,
                sampled_bytes: 0,
                covered_days: 7.0,
            }),
            resource_count: 12,
        };
        let estimation = EstimationConfig::default();
        let logs = derive_log_metrics(&inputs, &SamplingConfig::default(), &estimation);

        assert_eq!(logs.average_entry_bytes, estimation.default_entry_size_kb * 1024.0);
        assert_eq!(logs.daily_entries, 0.0);
        assert!(logs.daily_volume_gb.is_finite());

        let capacity = plan_capacity(&logs, &estimation);
        assert_eq!(capacity.throughput_units, estimation.min_throughput_units);
        assert_eq!(capacity.compute_instances, estimation.min_instances);
    }

    #[test]
    fn test_average_entry_size_from_sample() {
        let inputs = EstimateInputs {
            sample: Some(ActivitySample {
                sampled_entries: 700,
                sampled_bytes: 700 * 2048,
                covered_days: 7.0,
            }),
            resource_count: 0,
        };
        let logs = derive_log_metrics(
            &inputs,
            &SamplingConfig::default(),
            &EstimationConfig::default(),
        );
        assert_eq!(logs.average_entry_bytes, 2048.0);
        assert_eq!(logs.daily_entries, 100.0);
        assert_eq!(logs.sampled_entries, 700);
    }

    #[test]
    fn test_missing_sample_uses_resource_heuristic() {
        let sampling = SamplingConfig::default();
        let estimation = EstimationConfig::default();

        let busy = EstimateInputs {
            sample: None,
            resource_count: 300,
        };
        let logs = derive_log_metrics(&busy, &sampling, &estimation);
        assert!((logs.daily_entries - 300.0 * 5000.0 / 30.0).abs() < 1e-6);

        let quiet = EstimateInputs {
            sample: None,
            resource_count: 1,
        };
        let logs = derive_log_metrics(&quiet, &sampling, &estimation);
        assert_eq!(logs.daily_entries, sampling.min_fallback_daily_entries);
    }

    #[test]
    fn test_capacity_is_clamped() {
        let estimation = EstimationConfig::default();
        // 10,000 events/s of 2 KB: far beyond the maximums
        let logs = LogMetrics {
            sampled_entries: 1000,
            average_entry_bytes: 2048.0,
            daily_entries: 10_000.0 * 86_400.0,
            daily_volume_gb: 0.0,
            monthly_volume_gb: 0.0,
            events_per_second: 10_000.0,
        };
        let capacity = plan_capacity(&logs, &estimation);
        assert_eq!(capacity.throughput_units, estimation.max_throughput_units);
        assert_eq!(capacity.compute_instances, estimation.max_instances);
    }

    #[test]
    fn test_capacity_rounds_up() {
        let estimation = EstimationConfig::default();
        // 1,500 events/s of 100 bytes: 2 TUs by event count, 6 instances
        let logs = LogMetrics {
            sampled_entries: 1000,
            average_entry_bytes: 100.0,
            daily_entries: 1500.0 * 86_400.0,
            daily_volume_gb: 0.0,
            monthly_volume_gb: 0.0,
            events_per_second: 1500.0,
        };
        let capacity = plan_capacity(&logs, &estimation);
        assert_eq!(capacity.throughput_units, 2);
        assert_eq!(capacity.compute_instances, 6);
    }

    #[test]
    fn test_calculate_costs_components() {
        let estimation = EstimationConfig::default();
        let logs = LogMetrics {
            daily_volume_gb: 2.5,
            ..LogMetrics::default()
        };
        let capacity = CapacityPlan {
            throughput_units: 2,
            compute_instances: 3,
        };
        let costs = calculate_costs(&logs, &capacity, &pricing(), &estimation);

        // 2 * 0.03 * 730
        assert!((costs.event_streaming - 43.8).abs() < 1e-9);
        // 2.5 GB/day * 30 days * 0.02
        assert!((costs.storage - 1.5).abs() < 1e-9);
        // 3 * 0.2 * 730
        assert!((costs.compute - 438.0).abs() < 1e-9);
        // 100,000 / 10,000 * 0.03
        assert!((costs.secret_store - 0.3).abs() < 1e-9);
        // 4 * 0.01 * 730
        assert!((costs.private_networking - 29.2).abs() < 1e-9);
        // 1 * 0.045 * 730
        assert!((costs.fixed_overhead - 32.85).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_total_matches_components() {
        let inputs = EstimateInputs {
            sample: Some(ActivitySample {
                sampled_entries: 1000,
                sampled_bytes: 1_536_000,
                covered_days: 0.5,
            }),
            resource_count: 40,
        };
        let (logs, capacity, costs) = estimate(
            &inputs,
            &pricing(),
            &SamplingConfig::default(),
            &EstimationConfig::default(),
        );
        assert_eq!(logs.daily_entries, 2000.0);
        assert!(capacity.throughput_units >= 1);
        let summed: f64 = costs.components().iter().map(|(_, v)| v).sum();
        assert!((summed - costs.total()).abs() < 1e-9);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(12.346), "$12.35");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(999.999), "$1,000.00");
    }
}
