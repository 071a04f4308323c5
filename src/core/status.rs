use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Starting,
    Authenticating,
    Pricing,
    Enumerating,
    Estimating,
    Exporting,
    Completed,
    Failed,
}

/// Progress document polled by external tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_subscription: Option<String>,
    pub percent: f64,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusSnapshot {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Starting,
            total: 0,
            completed: 0,
            failed: 0,
            current_subscription: None,
            percent: 0.0,
            started_at: now,
            updated_at: now,
            message: None,
        }
    }

    fn refresh_percent(&mut self) {
        let done = self.completed + self.failed;
        self.percent = if self.total == 0 {
            0.0
        } else {
            ((done as f64 / self.total as f64) * 1000.0).round() / 10.0
        };
    }
}

/// Replace `path` with `content` without readers ever seeing a partial file
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Keeps the status snapshot current and mirrors it to disk
#[derive(Debug)]
pub struct StatusTracker {
    path: Option<PathBuf>,
    snapshot: StatusSnapshot,
}

impl StatusTracker {
    pub fn new(path: Option<PathBuf>) -> Self {
        let tracker = Self {
            path,
            snapshot: StatusSnapshot::new(Utc::now()),
        };
        tracker.persist();
        tracker
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn phase(&mut self, phase: Phase) {
        self.snapshot.phase = phase;
        self.touch();
    }

    pub fn begin_jobs(&mut self, total: usize) {
        self.snapshot.phase = Phase::Estimating;
        self.snapshot.total = total;
        self.snapshot.refresh_percent();
        self.touch();
    }

    pub fn started(&mut self, subscription: &str) {
        self.snapshot.current_subscription = Some(subscription.to_string());
        self.touch();
    }

    pub fn finished(&mut self, success: bool) {
        if success {
            self.snapshot.completed += 1;
        } else {
            self.snapshot.failed += 1;
        }
        self.snapshot.refresh_percent();
        self.touch();
    }

    pub fn complete(&mut self) {
        self.snapshot.phase = Phase::Completed;
        self.snapshot.current_subscription = None;
        self.snapshot.percent = 100.0;
        self.touch();
    }

    pub fn fail(&mut self, message: &str) {
        self.snapshot.phase = Phase::Failed;
        self.snapshot.message = Some(message.to_string());
        self.touch();
    }

    fn touch(&mut self) {
        self.snapshot.updated_at = Utc::now();
        self.persist();
    }

    /// Status writes never fail the run
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_vec_pretty(&self.snapshot)
            .map_err(Into::into)
            .and_then(|content| write_atomic(path, &content));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write status file");
        }
    }
}
