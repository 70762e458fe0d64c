//! Exactly-once and per-partition ordering check.
//!
//! A delivery is an `ok` consume. Each delivery is identified by the triple
//! `(partition, key, offset)`; missing payload fields fall back to
//! `partition = "0"`, `key = ""` and `offset = -1` rather than failing.
//! Offsets are widened to `i128` so that any JSON integer, including one
//! above `i64::MAX` or written as an integral float, keeps its value.
//!
//! Deliveries are scanned in index order. A triple seen more than once is a
//! duplicate. Within a partition, an offset strictly lower than the last
//! non-negative offset seen is out of order. Negative offsets are sentinels
//! and are skipped by the ordering scan entirely.

use std::collections::HashMap;
use std::time::Instant;

use eos_core::{Operation, Payload};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{Anomaly, CheckResult, CheckStats, Checker};

const DEFAULT_PARTITION: &str = "0";
const DEFAULT_OFFSET: i128 = -1;

/// The identity of one consumed message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delivery {
    /// Partition the message was read from.
    pub partition: String,
    /// Message key.
    pub key: String,
    /// Offset within the partition, `-1` when unknown.
    pub offset: i128,
}

impl Delivery {
    /// Extracts the delivery identity from a consume payload.
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            partition: string_field(payload, "partition")
                .unwrap_or_else(|| DEFAULT_PARTITION.to_string()),
            key: string_field(payload, "key").unwrap_or_default(),
            offset: offset_field(payload),
        }
    }

    /// The `partition:key:offset` string used in anomaly messages.
    pub fn delivery_key(&self) -> String {
        format!("{}:{}:{}", self.partition, self.key, self.offset)
    }
}

fn string_field(payload: &Payload, name: &str) -> Option<String> {
    match payload.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn offset_field(payload: &Payload) -> i128 {
    let value = match payload.get("offset") {
        None | Some(Value::Null) => return DEFAULT_OFFSET,
        Some(value) => value,
    };
    if let Some(n) = value.as_i64() {
        return n.into();
    }
    if let Some(n) = value.as_u64() {
        return n.into();
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => f as i128,
        _ => {
            debug!(offset = %value, "Offset is not an integer, treating as unknown");
            DEFAULT_OFFSET
        }
    }
}

/// Checker for duplicate deliveries and partition offset regressions.
#[derive(Debug, Clone, Default)]
pub struct EosChecker;

impl EosChecker {
    /// Creates a new checker.
    pub fn new() -> Self {
        Self
    }
}

impl Checker for EosChecker {
    fn name(&self) -> &str {
        "eos"
    }

    fn description(&self) -> &str {
        "Flags messages consumed more than once and partitions whose offsets go backwards"
    }

    #[instrument(skip(self, history), fields(operations = history.len()))]
    fn check(&self, history: &[Operation]) -> CheckResult {
        let start = Instant::now();

        let mut deliveries: Vec<&Operation> =
            history.iter().filter(|op| op.is_delivery()).collect();
        deliveries.sort_by_key(|op| op.index);

        let mut anomalies = Vec::new();
        let mut seen: HashMap<String, Vec<u64>> = HashMap::new();
        let mut last_offset: HashMap<String, i128> = HashMap::new();

        for op in &deliveries {
            let delivery = Delivery::from_payload(&op.payload);
            let delivery_key = delivery.delivery_key();

            let indices = seen.entry(delivery_key.clone()).or_default();
            indices.push(op.index);
            if indices.len() > 1 {
                anomalies.push(Anomaly::duplicate(&delivery_key, indices.clone()));
            }

            if delivery.offset < 0 {
                continue;
            }
            match last_offset.get_mut(&delivery.partition) {
                Some(last) => {
                    if delivery.offset < *last {
                        anomalies.push(Anomaly::out_of_order(
                            &delivery.partition,
                            delivery.offset,
                            *last,
                            op.index,
                        ));
                    }
                    *last = delivery.offset;
                }
                None => {
                    last_offset.insert(delivery.partition.clone(), delivery.offset);
                }
            }
        }

        let stats = CheckStats {
            operations_examined: history.len(),
            deliveries: deliveries.len(),
            distinct_messages: seen.len(),
            partitions: last_offset.len(),
        };

        debug!(
            deliveries = stats.deliveries,
            anomalies = anomalies.len(),
            "EOS check complete"
        );

        CheckResult::from_anomalies(anomalies)
            .with_stats(stats)
            .with_duration(start.elapsed())
    }
}

/// Runs the EOS check over a history and returns `(passed, anomalies)`.
pub fn check(history: &[Operation]) -> (bool, Vec<Anomaly>) {
    EosChecker::new().check(history).into_parts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnomalyType;
    use chrono::Utc;
    use eos_core::{OpFunction, OpKind, ProcessId};
    use serde_json::json;

    fn op(index: u64, kind: OpKind, function: OpFunction, payload: Value) -> Operation {
        Operation {
            index,
            kind,
            function,
            payload: payload.as_object().cloned().unwrap_or_default(),
            timestamp: Utc::now(),
            process: ProcessId::consumer(0),
        }
    }

    fn delivery(index: u64, partition: &str, key: &str, offset: i64) -> Operation {
        op(
            index,
            OpKind::Ok,
            OpFunction::Consume,
            json!({"key": key, "offset": offset, "partition": partition}),
        )
    }

    #[test]
    fn test_empty_history_passes() {
        let (passed, anomalies) = check(&[]);
        assert!(passed);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_clean_history_passes() {
        let history = vec![
            op(1, OpKind::Invoke, OpFunction::Consume, json!({"topic": "jepsen-test"})),
            delivery(2, "0", "key-1", 0),
            delivery(3, "0", "key-2", 1),
            delivery(4, "1", "key-1", 0),
            delivery(5, "0", "key-3", 2),
        ];

        let result = EosChecker::new().check(&history);
        assert!(result.is_pass());
        assert_eq!(result.stats.deliveries, 4);
        assert_eq!(result.stats.partitions, 2);
    }

    #[test]
    fn test_duplicate_anomalies_are_cumulative() {
        let history = vec![
            delivery(5, "0", "key-7", 4),
            delivery(9, "0", "key-7", 4),
            delivery(12, "0", "key-7", 4),
        ];

        let (passed, anomalies) = check(&history);
        assert!(!passed);
        assert_eq!(anomalies.len(), 2);

        assert_eq!(anomalies[0].anomaly_type, AnomalyType::DuplicateDelivery);
        assert_eq!(anomalies[0].operations, vec![5, 9]);
        assert_eq!(anomalies[0].message, "Message 0:key-7:4 delivered 2 times");

        assert_eq!(anomalies[1].operations, vec![5, 9, 12]);
        assert_eq!(anomalies[1].message, "Message 0:key-7:4 delivered 3 times");
    }

    #[test]
    fn test_offset_regression_is_flagged() {
        let history = vec![
            delivery(1, "0", "a", 3),
            delivery(2, "0", "b", 7),
            delivery(3, "0", "c", 2),
        ];

        let (passed, anomalies) = check(&history);
        assert!(!passed);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::OutOfOrder);
        assert_eq!(anomalies[0].operations, vec![3]);
        assert_eq!(anomalies[0].message, "Partition 0: offset 2 after 7");
    }

    #[test]
    fn test_regression_resets_last_offset() {
        let history = vec![
            delivery(1, "0", "a", 7),
            delivery(2, "0", "b", 2),
            delivery(3, "0", "c", 3),
        ];

        let (_, anomalies) = check(&history);
        assert_eq!(anomalies.len(), 1);
    }

    #[test]
    fn test_equal_offsets_are_not_out_of_order() {
        let history = vec![delivery(1, "0", "a", 4), delivery(2, "0", "b", 4)];
        assert!(check(&history).0);
    }

    #[test]
    fn test_partitions_are_independent() {
        let history = vec![
            delivery(1, "0", "a", 9),
            delivery(2, "1", "b", 0),
            delivery(3, "2", "c", 1),
        ];
        assert!(check(&history).0);
    }

    #[test]
    fn test_negative_offsets_skip_ordering() {
        let history = vec![
            delivery(1, "0", "a", 5),
            delivery(2, "0", "b", -1),
            delivery(3, "0", "c", 6),
        ];
        assert!(check(&history).0);
    }

    #[test]
    fn test_non_deliveries_are_ignored() {
        let payload = json!({"key": "k", "offset": 1, "partition": "0"});
        let history = vec![
            op(1, OpKind::Invoke, OpFunction::Consume, payload.clone()),
            op(2, OpKind::Fail, OpFunction::Consume, payload.clone()),
            op(3, OpKind::Info, OpFunction::Consume, payload.clone()),
            op(4, OpKind::Ok, OpFunction::Produce, payload.clone()),
            op(5, OpKind::Ok, OpFunction::Produce, payload),
        ];

        let result = EosChecker::new().check(&history);
        assert!(result.is_pass());
        assert_eq!(result.stats.deliveries, 0);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let history = vec![
            op(1, OpKind::Ok, OpFunction::Consume, json!({})),
            op(2, OpKind::Ok, OpFunction::Consume, json!({"offset": "bogus"})),
        ];

        let (passed, anomalies) = check(&history);
        assert!(!passed);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].message, "Message 0::-1 delivered 2 times");
    }

    #[test]
    fn test_integral_float_offset_matches_integer() {
        let history = vec![
            op(
                1,
                OpKind::Ok,
                OpFunction::Consume,
                json!({"key": "k", "offset": 3.0, "partition": "0"}),
            ),
            delivery(2, "0", "k", 3),
        ];

        let (_, anomalies) = check(&history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].message, "Message 0:k:3 delivered 2 times");
    }

    #[test]
    fn test_fractional_offset_is_unknown() {
        let payload = json!({"key": "k", "offset": 2.5});
        let delivery = Delivery::from_payload(payload.as_object().unwrap());
        assert_eq!(delivery.offset, -1);
    }

    #[test]
    fn test_offset_above_i64_max_keeps_its_value() {
        let big = i64::MAX as u64 + 10;
        let history = vec![
            op(
                1,
                OpKind::Ok,
                OpFunction::Consume,
                json!({"key": "k", "offset": big, "partition": "0"}),
            ),
            op(2, OpKind::Ok, OpFunction::Consume, json!({"key": "k", "partition": "0"})),
            delivery(3, "0", "k2", 5),
        ];

        let (_, anomalies) = check(&history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::OutOfOrder);
        assert_eq!(
            anomalies[0].message,
            format!("Partition 0: offset 5 after {}", big)
        );
    }

    #[test]
    fn test_numeric_partition_matches_string_partition() {
        let history = vec![
            op(
                1,
                OpKind::Ok,
                OpFunction::Consume,
                json!({"key": "k", "offset": 3, "partition": 1}),
            ),
            delivery(2, "1", "k", 3),
        ];

        let (_, anomalies) = check(&history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::DuplicateDelivery);
    }

    #[test]
    fn test_deliveries_are_scanned_in_index_order() {
        let history = vec![delivery(3, "0", "b", 7), delivery(1, "0", "a", 3)];
        assert!(check(&history).0);
    }
}
