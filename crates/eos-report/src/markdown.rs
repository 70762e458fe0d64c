//! Markdown report generation.

use std::fmt::Write as _;
use std::path::Path;

use tracing::instrument;

use crate::types::{Report, ReportError};

/// Markdown report generator.
#[derive(Debug, Clone, Default)]
pub struct MarkdownReportGenerator {
    /// Heading level offset (0 = start with #, 1 = start with ##, etc.).
    heading_offset: usize,
}

impl MarkdownReportGenerator {
    /// Create a new Markdown report generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Nest every heading `offset` levels deeper.
    pub fn with_heading_offset(offset: usize) -> Self {
        Self {
            heading_offset: offset,
        }
    }

    /// Generate Markdown report as a string.
    #[instrument(skip(self, report), fields(name = %report.name))]
    pub fn generate(&self, report: &Report) -> Result<String, ReportError> {
        let mut md = String::with_capacity(1024);
        let status = if report.passed { "✅ PASS" } else { "❌ FAIL" };

        writeln!(md, "{} Jepsen Test Report: {}\n", self.heading(1), report.name)?;
        writeln!(md, "**Result: {}**\n", status)?;

        md.push_str("| Metric | Value |\n|--------|-------|\n");
        writeln!(md, "| Total Ops | {} |", report.total_ops)?;
        writeln!(md, "| Successful | {} |", report.ok_ops)?;
        writeln!(md, "| Failed | {} |", report.fail_ops)?;
        writeln!(md, "| Duration | {:.1}s |", report.duration_secs)?;
        writeln!(md, "| Nemesis Actions | {} |\n", report.nemesis_actions.len())?;

        if report.anomalies.is_empty() {
            writeln!(md, "{} No anomalies detected ✅", self.heading(2))?;
        } else {
            writeln!(md, "{} Anomalies\n", self.heading(2))?;
            for anomaly in &report.anomalies {
                writeln!(md, "- **{}**: {}", anomaly.anomaly_type, anomaly.message)?;
            }
        }

        Ok(md)
    }

    /// Generate Markdown report and write to a file.
    #[instrument(skip(self, report), fields(name = %report.name, path = %path.as_ref().display()))]
    pub fn generate_to_file(
        &self,
        report: &Report,
        path: impl AsRef<Path>,
    ) -> Result<(), ReportError> {
        std::fs::write(path, self.generate(report)?)?;
        Ok(())
    }

    fn heading(&self, level: usize) -> String {
        "#".repeat((level + self.heading_offset).min(6))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eos_checker::Anomaly;

    fn report(anomalies: Vec<Anomaly>) -> Report {
        Report {
            name: "eos-linearizability".into(),
            passed: anomalies.is_empty(),
            total_ops: 6000,
            ok_ops: 3000,
            fail_ops: 0,
            info_ops: 0,
            duration_secs: 60.04,
            nemesis_actions: vec![],
            anomalies,
            timestamp: "20260101_000000".into(),
        }
    }

    #[test]
    fn test_passing_report() {
        let md = MarkdownReportGenerator::new().generate(&report(vec![])).unwrap();

        assert!(md.starts_with("# Jepsen Test Report: eos-linearizability\n\n"));
        assert!(md.contains("**Result: ✅ PASS**"));
        assert!(md.contains("| Total Ops | 6000 |"));
        assert!(md.contains("| Successful | 3000 |"));
        assert!(md.contains("| Duration | 60.0s |"));
        assert!(md.contains("| Nemesis Actions | 0 |"));
        assert!(md.ends_with("## No anomalies detected ✅\n"));
    }

    #[test]
    fn test_failing_report_lists_anomalies() {
        let md = MarkdownReportGenerator::new().generate(&report(vec![
            Anomaly::duplicate("0:key-1:4", vec![5, 9]),
            Anomaly::out_of_order("2", 1, 8, 14),
        ]))
        .unwrap();

        assert!(md.contains("**Result: ❌ FAIL**"));
        assert!(md.contains("## Anomalies\n\n"));
        assert!(md.contains("- **duplicate_delivery**: Message 0:key-1:4 delivered 2 times\n"));
        assert!(md.contains("- **out_of_order**: Partition 2: offset 1 after 8\n"));
    }

    #[test]
    fn test_heading_offset() {
        let md = MarkdownReportGenerator::with_heading_offset(1).generate(&report(vec![])).unwrap();
        assert!(md.starts_with("## Jepsen Test Report"));
        assert!(md.contains("### No anomalies detected"));
    }
}
