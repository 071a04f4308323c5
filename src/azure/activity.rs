use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::client::ArmClient;
use crate::billing::calculator::ActivitySample;
use crate::error::Result;

const SECONDS_PER_DAY: f64 = 86_400.0;
/// Shortest span a truncated sample is assumed to cover
const MIN_SAMPLE_SPAN_SECS: i64 = 60;

/// OData window filter for the activity log
pub fn window_filter(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "eventTimestamp ge '{}' and eventTimestamp le '{}'",
        start.format("%Y-%m-%dT%H:%M:%SZ"),
        end.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

fn event_timestamp(event: &Value) -> Option<DateTime<Utc>> {
    let raw = event.get("eventTimestamp")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Running statistics over sampled activity-log entries
#[derive(Debug, Default)]
struct SampleAccumulator {
    entries: u64,
    bytes: u64,
    oldest: Option<DateTime<Utc>>,
    newest: Option<DateTime<Utc>>,
    truncated: bool,
}

impl SampleAccumulator {
    fn push(&mut self, event: &Value) {
        self.entries += 1;
        self.bytes += serde_json::to_vec(event)
            .map(|raw| raw.len() as u64)
            .unwrap_or_default();
        if let Some(ts) = event_timestamp(event) {
            self.oldest = Some(self.oldest.map_or(ts, |o| o.min(ts)));
            self.newest = Some(self.newest.map_or(ts, |n| n.max(ts)));
        }
    }

    /// A complete sample covers the whole window; a truncated one only
    /// the span between its oldest and newest entry.
    fn finish(self, days: u32) -> ActivitySample {
        let window_days = days as f64;
        let covered_days = match (self.truncated, self.oldest, self.newest) {
            (true, Some(oldest), Some(newest)) => {
                let span = (newest - oldest).num_seconds().max(MIN_SAMPLE_SPAN_SECS);
                (span as f64 / SECONDS_PER_DAY).min(window_days)
            }
            _ => window_days,
        };

        ActivitySample {
            sampled_entries: self.entries,
            sampled_bytes: self.bytes,
            covered_days,
        }
    }
}

/// Pull up to `sample_size` activity-log entries from the last `days` days
pub async fn sample_activity(
    client: &ArmClient,
    subscription_id: &str,
    days: u32,
    sample_size: usize,
    now: DateTime<Utc>,
) -> Result<ActivitySample> {
    let filter = window_filter(now - Duration::days(days as i64), now);
    let url = client.url(
        &format!(
            "/subscriptions/{}/providers/Microsoft.Insights/eventtypes/management/values",
            subscription_id
        ),
        &[
            ("api-version", client.config().activity_log_api_version.as_str()),
            ("$filter", filter.as_str()),
        ],
    )?;

    let mut acc = SampleAccumulator::default();
    client
        .get_pages(&url, |page: Vec<Value>| {
            for event in &page {
                if acc.entries as usize >= sample_size {
                    acc.truncated = true;
                    return false;
                }
                acc.push(event);
            }
            true
        })
        .await?;

    let truncated = acc.truncated;
    let sample = acc.finish(days);
    tracing::debug!(
        subscription = subscription_id,
        entries = sample.sampled_entries,
        bytes = sample.sampled_bytes,
        covered_days = sample.covered_days,
        truncated,
        "Sampled activity log"
    );
    Ok(sample)
}
