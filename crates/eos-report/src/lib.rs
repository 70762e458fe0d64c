//! # eos-report
//!
//! Turns a [`TestResult`](eos_runner::TestResult) into the artifacts CI and
//! humans read:
//!
//! - [`Report`]: the flat, serializable record downstream tooling parses
//! - [`JsonReportGenerator`]: `jepsen_<timestamp>.json`
//! - [`MarkdownReportGenerator`]: `jepsen_<timestamp>.md`
//! - [`summary_banner`]: the console summary printed at the end of a run
//!
//! ## Example
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use eos_report::{write_reports_to_directory, Report};
//!
//! let report = Report::from_result(&result, Utc::now());
//! let paths = write_reports_to_directory(&report, "/results")?;
//! println!("{}", paths.json.display());
//! ```

pub mod console;
pub mod json;
pub mod markdown;
pub mod types;

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

pub use console::summary_banner;
pub use json::{JsonFormat, JsonReportGenerator};
pub use markdown::MarkdownReportGenerator;
pub use types::{Report, ReportError, TIMESTAMP_FORMAT};

/// Where the report files landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// The JSON report.
    pub json: PathBuf,
    /// The Markdown report.
    pub markdown: PathBuf,
}

/// Writes the JSON and Markdown reports into `dir`, creating it if needed.
///
/// Files are named `jepsen_<timestamp>.json` and `jepsen_<timestamp>.md`
/// after the report's own timestamp.
#[instrument(skip(report), fields(name = %report.name, dir = %dir.as_ref().display()))]
pub fn write_reports_to_directory(
    report: &Report,
    dir: impl AsRef<Path>,
) -> Result<ReportPaths, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let paths = ReportPaths {
        json: dir.join(format!("jepsen_{}.json", report.timestamp)),
        markdown: dir.join(format!("jepsen_{}.md", report.timestamp)),
    };

    JsonReportGenerator::new().generate_to_file(report, &paths.json)?;
    MarkdownReportGenerator::new().generate_to_file(report, &paths.markdown)?;

    info!(
        json = %paths.json.display(),
        markdown = %paths.markdown.display(),
        "Reports written"
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        Report {
            name: "eos-linearizability".into(),
            passed: true,
            total_ops: 20,
            ok_ops: 10,
            fail_ops: 0,
            info_ops: 0,
            duration_secs: 1.0,
            nemesis_actions: vec![],
            anomalies: vec![],
            timestamp: "20260101_120000".into(),
        }
    }

    #[test]
    fn test_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports_to_directory(&report(), dir.path()).unwrap();

        assert_eq!(paths.json, dir.path().join("jepsen_20260101_120000.json"));
        assert_eq!(paths.markdown, dir.path().join("jepsen_20260101_120000.md"));
        assert!(paths.json.exists());
        assert!(paths.markdown.exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("results").join("nightly");
        write_reports_to_directory(&report(), &nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let err = write_reports_to_directory(&report(), &blocker).unwrap_err();
        assert!(matches!(err, ReportError::IoError(_)));
    }
}
