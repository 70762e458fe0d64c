//! Console summary.

use crate::types::Report;

const RULE_WIDTH: usize = 60;

/// The end-of-run banner.
pub fn summary_banner(report: &Report) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let status = if report.passed { "✅ PASSED" } else { "❌ FAILED" };
    format!(
        "{rule}\nResult: {status}\n  Total ops: {}\n  Duration: {:.1}s\n  Nemesis actions: {}\n  Anomalies: {}\n{rule}",
        report.total_ops,
        report.duration_secs,
        report.nemesis_actions.len(),
        report.anomalies.len(),
    )
}
