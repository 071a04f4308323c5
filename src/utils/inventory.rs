use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::azure::{ResourceInventory, Subscription};
use crate::billing::calculator::ActivitySample;
use crate::error::{EstimatorError, Result};

/// Pre-sampled activity of one subscription
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedActivity {
    pub sampled_entries: u64,
    pub sampled_bytes: u64,
    pub covered_days: f64,
}

impl From<RecordedActivity> for ActivitySample {
    fn from(recorded: RecordedActivity) -> Self {
        ActivitySample {
            sampled_entries: recorded.sampled_entries,
            sampled_bytes: recorded.sampled_bytes,
            covered_days: recorded.covered_days,
        }
    }
}

/// One subscription of an offline inventory file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    #[serde(flatten)]
    pub subscription: Subscription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_group: Option<String>,
    /// `None` when the activity log could not be sampled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<RecordedActivity>,
    #[serde(default)]
    pub resources: ResourceInventory,
}

impl InventoryRecord {
    /// Records without a state count as enabled
    pub fn is_enabled(&self) -> bool {
        self.subscription.state.is_empty() || self.subscription.is_enabled()
    }
}

/// Load an inventory file: a JSON array, or JSONL with one record per line.
/// Blank and malformed JSONL lines are skipped with a warning.
pub fn load_inventory(path: &Path) -> Result<Vec<InventoryRecord>> {
    let content = fs::read_to_string(path)?;

    let records = if content.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<InventoryRecord>>(&content).map_err(|e| {
            EstimatorError::Inventory(format!("{}: {}", path.display(), e))
        })?
    } else {
        parse_jsonl(&content, path)
    };

    Ok(dedupe(records))
}

fn parse_jsonl(content: &str, path: &Path) -> Vec<InventoryRecord> {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    lines
        .par_iter()
        .filter_map(|(index, line)| match serde_json::from_str::<InventoryRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed inventory line"
                );
                None
            }
        })
        .collect()
}

/// Keep the first record of each subscription id
fn dedupe(records: Vec<InventoryRecord>) -> Vec<InventoryRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(record.subscription.subscription_id.to_lowercase());
            if !fresh {
                tracing::warn!(
                    subscription = %record.subscription.subscription_id,
                    "Duplicate inventory record ignored"
                );
            }
            fresh
        })
        .collect()
}
