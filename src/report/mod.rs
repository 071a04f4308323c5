pub mod csv;
pub mod html;
pub mod json;

use std::fs;
use std::path::PathBuf;

use crate::billing::{CostReport, GroupKey};
use crate::config::OutputConfig;
use crate::error::Result;

/// Files written by `export_all` and the ones that failed
#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl ExportOutcome {
    fn record(&mut self, path: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Wrote report");
                self.written.push(path);
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to write report");
                self.failed.push((path, e.to_string()));
            }
        }
    }
}

/// Write every configured report. A failing export is logged and the rest still run.
pub fn export_all(report: &CostReport, output: &OutputConfig) -> ExportOutcome {
    let mut outcome = ExportOutcome::default();

    if let Err(e) = fs::create_dir_all(&output.directory) {
        tracing::error!(
            directory = %output.directory.display(),
            error = %e,
            "Failed to create output directory"
        );
    }

    let path = output.path_for(&output.subscription_csv);
    let result = csv::write_subscriptions_file(&path, &report.subscriptions);
    outcome.record(path, result);

    let mut group_files = vec![
        (GroupKey::BusinessUnit, &output.business_unit_csv, Some(&report.by_business_unit)),
        (GroupKey::Region, &output.region_csv, Some(&report.by_region)),
    ];
    if output.include_management_groups {
        group_files.push((
            GroupKey::ManagementGroup,
            &output.management_group_csv,
            report.by_management_group.as_ref(),
        ));
    }
    for (key, file, groups) in group_files {
        let Some(groups) = groups else {
            continue;
        };
        let path = output.path_for(file);
        let result = csv::write_groups_file(&path, key, groups, report.grand_total);
        outcome.record(path, result);
    }

    let path = output.path_for(&output.json_summary);
    let result = json::write_summary(&path, report);
    outcome.record(path, result);

    let path = output.path_for(&output.html_report);
    let result = html::write_report(&path, report, output.include_charts);
    outcome.record(path, result);

    outcome
}
