use std::path::Path;

use crate::billing::CostReport;
use crate::core::status::write_atomic;
use crate::error::Result;

/// Write the full report, including raw metrics, as pretty JSON
pub fn write_summary(path: &Path, report: &CostReport) -> Result<()> {
    let content = serde_json::to_vec_pretty(report)?;
    write_atomic(path, &content)
}
