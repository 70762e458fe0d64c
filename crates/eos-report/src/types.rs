//! Report record and errors.

use chrono::{DateTime, Utc};
use eos_checker::Anomaly;
use eos_nemesis::NemesisAction;
use eos_runner::TestResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `strftime` pattern for report timestamps and file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// The structured report.
///
/// Field names and order are a contract with downstream tooling; keep them
/// as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Test name.
    pub name: String,
    /// Verdict.
    pub passed: bool,
    /// Every recorded operation, invocations included.
    pub total_ops: usize,
    /// `ok` completions.
    pub ok_ops: usize,
    /// `fail` completions.
    pub fail_ops: usize,
    /// `info` completions.
    pub info_ops: usize,
    /// Elapsed seconds.
    pub duration_secs: f64,
    /// Nemesis action log.
    pub nemesis_actions: Vec<NemesisAction>,
    /// Checker anomalies.
    pub anomalies: Vec<Anomaly>,
    /// When the report was generated, `YYYYmmdd_HHMMSS` in UTC.
    pub timestamp: String,
}

impl Report {
    /// Flattens a result, stamping it with `generated_at`.
    pub fn from_result(result: &TestResult, generated_at: DateTime<Utc>) -> Self {
        Self {
            name: result.name.clone(),
            passed: result.passed,
            total_ops: result.total_ops,
            ok_ops: result.ok_ops,
            fail_ops: result.fail_ops,
            info_ops: result.info_ops,
            duration_secs: result.duration.as_secs_f64(),
            nemesis_actions: result.nemesis_actions.clone(),
            anomalies: result.anomalies.clone(),
            timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Errors that can occur while producing reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Formatting error while rendering text output.
    #[error("Format error: {0}")]
    FormatError(#[from] std::fmt::Error),
}
