use std::io::Write;
use std::path::Path;

use crate::billing::{GroupKey, GroupSummary, SubscriptionEstimate};
use crate::core::status::write_atomic;
use crate::error::Result;

const SUBSCRIPTION_HEADER: [&str; 22] = [
    "subscription_id",
    "subscription_name",
    "region",
    "environment",
    "business_unit",
    "management_group",
    "resource_count",
    "sampled_entries",
    "average_entry_bytes",
    "daily_entries",
    "daily_volume_gb",
    "monthly_volume_gb",
    "throughput_units",
    "compute_instances",
    "event_streaming_cost",
    "storage_cost",
    "compute_cost",
    "secret_store_cost",
    "private_networking_cost",
    "fixed_overhead_cost",
    "monthly_cost",
    "notes",
];

fn money(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// One row per subscription with metrics and the full cost breakdown
pub fn write_subscriptions<W: Write>(writer: W, estimates: &[SubscriptionEstimate]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(SUBSCRIPTION_HEADER)?;

    for e in estimates {
        csv.write_record([
            e.subscription_id.clone(),
            e.subscription_name.clone(),
            e.region.clone(),
            e.environment.clone(),
            e.business_unit.clone(),
            e.management_group.clone().unwrap_or_default(),
            e.resource_count.to_string(),
            e.logs.sampled_entries.to_string(),
            format!("{:.1}", e.logs.average_entry_bytes),
            format!("{:.1}", e.logs.daily_entries),
            format!("{:.4}", e.logs.daily_volume_gb),
            format!("{:.4}", e.logs.monthly_volume_gb),
            e.capacity.throughput_units.to_string(),
            e.capacity.compute_instances.to_string(),
            money(e.costs.event_streaming),
            money(e.costs.storage),
            money(e.costs.compute),
            money(e.costs.secret_store),
            money(e.costs.private_networking),
            money(e.costs.fixed_overhead),
            money(e.monthly_cost),
            e.notes.join("; "),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// One row per group, with its share of the grand total
pub fn write_groups<W: Write>(
    writer: W,
    key: GroupKey,
    groups: &[GroupSummary],
    grand_total: f64,
) -> Result<()> {
    let label_column = key.title().to_lowercase().replace(' ', "_");
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        label_column.as_str(),
        "monthly_cost",
        "subscription_count",
        "percent_of_total",
        "subscriptions",
    ])?;

    for group in groups {
        let percent = if grand_total > 0.0 {
            group.monthly_cost / grand_total * 100.0
        } else {
            0.0
        };
        csv.write_record([
            group.label.clone(),
            money(group.monthly_cost),
            group.subscription_count.to_string(),
            format!("{:.2}", percent),
            group.subscriptions.join("; "),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

pub fn write_subscriptions_file(path: &Path, estimates: &[SubscriptionEstimate]) -> Result<()> {
    let mut buffer = Vec::new();
    write_subscriptions(&mut buffer, estimates)?;
    write_atomic(path, &buffer)
}

pub fn write_groups_file(
    path: &Path,
    key: GroupKey,
    groups: &[GroupSummary],
    grand_total: f64,
) -> Result<()> {
    let mut buffer = Vec::new();
    write_groups(&mut buffer, key, groups, grand_total)?;
    write_atomic(path, &buffer)
}
