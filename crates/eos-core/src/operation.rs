//! Operation records.
//!
//! An [`Operation`] is one entry in the history: either the invocation of a
//! produce/consume call or its outcome. Operations are immutable once
//! recorded; the history hands out clones.

use crate::node::ProcessId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key/value payload attached to an operation.
///
/// Completed consumes carry `key`, `offset` and `partition`. Nothing else
/// about the shape is enforced.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// The kind of a history record.
///
/// `Info` means the outcome is unknown (for example a timeout). It is neither
/// a success nor a failure for correctness purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// The call has been issued.
    Invoke,
    /// The call completed successfully.
    Ok,
    /// The call definitely did not take effect.
    Fail,
    /// The outcome is indeterminate.
    Info,
}

impl OpKind {
    /// Returns true for `ok`, `fail` and `info`.
    pub fn is_completion(self) -> bool {
        !matches!(self, Self::Invoke)
    }

    /// The lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoke => "invoke",
            Self::Ok => "ok",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The function an operation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpFunction {
    /// Append a message to the topic.
    Produce,
    /// Read a message from the topic.
    Consume,
}

impl OpFunction {
    /// The lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Produce => "produce",
            Self::Consume => "consume",
        }
    }
}

impl fmt::Display for OpFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded operation.
///
/// `index` is assigned by [`History::record`](crate::history::History::record)
/// and defines the total order of recording. Timestamps are captured at the
/// same moment but are only informational; concurrent writers may produce
/// equal or inverted timestamps.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use eos_core::node::ProcessId;
/// use eos_core::operation::{OpFunction, OpKind, Operation, Payload};
///
/// let op = Operation {
///     index: 1,
///     kind: OpKind::Ok,
///     function: OpFunction::Consume,
///     payload: Payload::new(),
///     timestamp: Utc::now(),
///     process: ProcessId::consumer(0),
/// };
///
/// assert!(op.is_delivery());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Global, strictly increasing recording index (starts at 1).
    pub index: u64,

    /// Invocation or outcome.
    pub kind: OpKind,

    /// Which broker call this record belongs to.
    pub function: OpFunction,

    /// Call arguments or results.
    pub payload: Payload,

    /// Wall-clock capture time.
    pub timestamp: DateTime<Utc>,

    /// Actor that issued the operation.
    pub process: ProcessId,
}

impl Operation {
    /// Returns true if this record is a successful consume, i.e. a delivery.
    pub fn is_delivery(&self) -> bool {
        self.kind == OpKind::Ok && self.function == OpFunction::Consume
    }

    /// Looks up a payload field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload.get(name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Op[{} @ {}] {} {} {}",
            self.index,
            self.process,
            self.kind,
            self.function,
            serde_json::Value::Object(self.payload.clone())
        )
    }
}
