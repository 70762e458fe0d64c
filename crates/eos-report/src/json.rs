//! JSON report generation.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::instrument;

use crate::types::{Report, ReportError};

/// JSON report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Compact JSON (single line, minimal whitespace).
    Compact,
    /// Pretty-printed JSON with two-space indentation.
    #[default]
    Pretty,
    /// Pretty-printed with custom indentation.
    PrettyIndent(usize),
}

/// JSON report generator.
#[derive(Debug, Clone, Default)]
pub struct JsonReportGenerator {
    format: JsonFormat,
}

impl JsonReportGenerator {
    /// Create a generator producing pretty-printed output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator with a specific format.
    pub fn with_format(format: JsonFormat) -> Self {
        Self { format }
    }

    /// Generate JSON report as a string.
    #[instrument(skip(self, report), fields(name = %report.name))]
    pub fn generate(&self, report: &Report) -> Result<String, ReportError> {
        let json = match self.format {
            JsonFormat::Compact => serde_json::to_string(report)?,
            JsonFormat::Pretty => serde_json::to_string_pretty(report)?,
            JsonFormat::PrettyIndent(indent) => {
                let mut writer = Vec::new();
                self.write_indented(report, indent, &mut writer)?;
                String::from_utf8_lossy(&writer).into_owned()
            }
        };
        Ok(json)
    }

    /// Generate JSON report and write to a file.
    #[instrument(skip(self, report), fields(name = %report.name, path = %path.as_ref().display()))]
    pub fn generate_to_file(
        &self,
        report: &Report,
        path: impl AsRef<Path>,
    ) -> Result<(), ReportError> {
        let json = self.generate(report)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Generate JSON report and write to a writer.
    pub fn generate_to_writer<W: Write>(
        &self,
        report: &Report,
        mut writer: W,
    ) -> Result<(), ReportError> {
        match self.format {
            JsonFormat::Compact => serde_json::to_writer(&mut writer, report)?,
            JsonFormat::Pretty => serde_json::to_writer_pretty(&mut writer, report)?,
            JsonFormat::PrettyIndent(indent) => self.write_indented(report, indent, &mut writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    fn write_indented<W: Write>(
        &self,
        report: &Report,
        indent: usize,
        writer: W,
    ) -> Result<(), ReportError> {
        let indent_str = " ".repeat(indent);
        let formatter = PrettyFormatter::with_indent(indent_str.as_bytes());
        let mut serializer = Serializer::with_formatter(writer, formatter);
        report.serialize(&mut serializer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eos_checker::Anomaly;
    use eos_nemesis::NemesisAction;

    fn report() -> Report {
        Report {
            name: "eos-linearizability".into(),
            passed: false,
            total_ops: 6,
            ok_ops: 3,
            fail_ops: 0,
            info_ops: 0,
            duration_secs: 0.3,
            nemesis_actions: vec![NemesisAction::noop("No nodes available")],
            anomalies: vec![Anomaly::duplicate("0:key-1:4", vec![2, 6])],
            timestamp: "20260101_000000".into(),
        }
    }

    #[test]
    fn test_generated_json_parses_back() {
        let json = JsonReportGenerator::new().generate(&report()).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_compact_is_single_line() {
        let json = JsonReportGenerator::with_format(JsonFormat::Compact)
            .generate(&report())
            .unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"type\":\"duplicate_delivery\""));
    }

    #[test]
    fn test_custom_indent() {
        let json = JsonReportGenerator::with_format(JsonFormat::PrettyIndent(4))
            .generate(&report())
            .unwrap();
        assert!(json.contains("\n    \"name\""));
    }

    #[test]
    fn test_writer_matches_string() {
        let generator = JsonReportGenerator::new();
        let mut buf = Vec::new();
        generator.generate_to_writer(&report(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), generator.generate(&report()).unwrap());
    }
}
