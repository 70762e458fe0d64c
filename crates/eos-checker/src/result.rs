//! Result types for history checks.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The class of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// A message was delivered more than once.
    DuplicateDelivery,
    /// A partition's offsets went backwards.
    OutOfOrder,
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyType::DuplicateDelivery => write!(f, "duplicate_delivery"),
            AnomalyType::OutOfOrder => write!(f, "out_of_order"),
        }
    }
}

/// A detected invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    /// The anomaly class.
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    /// Human-readable explanation.
    pub message: String,
    /// Indices of the operations involved.
    pub operations: Vec<u64>,
}

impl Anomaly {
    /// Create a duplicate delivery anomaly.
    pub fn duplicate(delivery_key: &str, operations: Vec<u64>) -> Self {
        Self {
            anomaly_type: AnomalyType::DuplicateDelivery,
            message: format!(
                "Message {} delivered {} times",
                delivery_key,
                operations.len()
            ),
            operations,
        }
    }

    /// Create an out-of-order anomaly for the operation at `index`.
    pub fn out_of_order(partition: &str, offset: i128, last_seen: i128, index: u64) -> Self {
        Self {
            anomaly_type: AnomalyType::OutOfOrder,
            message: format!("Partition {}: offset {} after {}", partition, offset, last_seen),
            operations: vec![index],
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (ops {:?})", self.anomaly_type, self.message, self.operations)
    }
}

/// Statistics about one check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// Operations in the input history.
    pub operations_examined: usize,
    /// Operations that counted as deliveries.
    pub deliveries: usize,
    /// Distinct `(partition, key, offset)` triples seen.
    pub distinct_messages: usize,
    /// Distinct partitions with at least one ordered offset.
    pub partitions: usize,
}

/// The result of checking a history.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// True iff no anomalies were found.
    pub passed: bool,
    /// Every anomaly, in detection order.
    pub anomalies: Vec<Anomaly>,
    /// Statistics about the check process.
    pub stats: CheckStats,
    /// Time taken to perform the check.
    pub duration: Option<Duration>,
}

impl CheckResult {
    /// Builds a result whose verdict follows from the anomaly list.
    pub fn from_anomalies(anomalies: Vec<Anomaly>) -> Self {
        Self {
            passed: anomalies.is_empty(),
            anomalies,
            stats: CheckStats::default(),
            duration: None,
        }
    }

    /// Add statistics to this result.
    pub fn with_stats(mut self, stats: CheckStats) -> Self {
        self.stats = stats;
        self
    }

    /// Add the duration to this result.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Check if this result indicates the history passed.
    pub fn is_pass(&self) -> bool {
        self.passed
    }

    /// Number of anomalies of the given class.
    pub fn count(&self, anomaly_type: AnomalyType) -> usize {
        self.anomalies
            .iter()
            .filter(|a| a.anomaly_type == anomaly_type)
            .count()
    }

    /// Splits into the `(passed, anomalies)` pair.
    pub fn into_parts(self) -> (bool, Vec<Anomaly>) {
        (self.passed, self.anomalies)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CheckResult {{ status: {}, anomalies: {}",
            if self.passed { "PASS" } else { "FAIL" },
            self.anomalies.len()
        )?;
        if let Some(duration) = self.duration {
            write!(f, ", duration: {:?}", duration)?;
        }
        write!(f, " }}")
    }
}
