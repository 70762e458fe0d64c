//! The history store.
//!
//! [`History`] is the single point of shared mutable state between workload
//! actors. Index assignment and the append happen inside one critical
//! section, so the recorded indices are exactly `1..=N` regardless of how
//! many callers race on [`History::record`].

use crate::node::ProcessId;
use crate::operation::{OpFunction, OpKind, Operation, Payload};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;
use uuid::Uuid;

/// Unique identifier for a test run.
///
/// # Examples
///
/// ```
/// use eos_core::history::RunId;
///
/// let run_id = RunId::new();
/// assert_ne!(run_id, RunId::new());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new unique RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a RunId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation counts broken down by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpCounts {
    /// Every recorded operation, invocations included.
    pub total: usize,
    /// Invocations.
    pub invoke: usize,
    /// Successful completions.
    pub ok: usize,
    /// Failed completions.
    pub fail: usize,
    /// Indeterminate completions.
    pub info: usize,
}

impl OpCounts {
    /// Tallies a slice of operations.
    pub fn from_operations(operations: &[Operation]) -> Self {
        operations.iter().fold(Self::default(), |mut counts, op| {
            counts.total += 1;
            match op.kind {
                OpKind::Invoke => counts.invoke += 1,
                OpKind::Ok => counts.ok += 1,
                OpKind::Fail => counts.fail += 1,
                OpKind::Info => counts.info += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Default)]
struct HistoryInner {
    last_index: u64,
    operations: Vec<Operation>,
}

/// Append-only, thread-safe ledger of operations for one test run.
///
/// There is no removal: the store only grows for the lifetime of a run.
#[derive(Debug)]
pub struct History {
    run_id: RunId,
    inner: Mutex<HistoryInner>,
}

impl History {
    /// Creates an empty history for the given run.
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            inner: Mutex::new(HistoryInner::default()),
        }
    }

    /// The run this history belongs to.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Records one operation and returns a copy of the stored record.
    ///
    /// The index is assigned and the timestamp captured while the lock is
    /// held, so index order is also the append order.
    pub fn record(
        &self,
        kind: OpKind,
        function: OpFunction,
        payload: Payload,
        process: ProcessId,
    ) -> Operation {
        let mut inner = self.lock();
        inner.last_index += 1;
        let op = Operation {
            index: inner.last_index,
            kind,
            function,
            payload,
            timestamp: Utc::now(),
            process,
        };
        inner.operations.push(op.clone());
        drop(inner);

        trace!(index = op.index, kind = %op.kind, function = %op.function, process = %op.process, "Recorded operation");
        op
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.lock().operations.len()
    }

    /// Returns true if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.lock().operations.is_empty()
    }

    /// Copies out every operation recorded so far, in index order.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Counts recorded operations by kind.
    pub fn counts(&self) -> OpCounts {
        OpCounts::from_operations(&self.lock().operations)
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        // A panicking recorder cannot leave the ledger half-written: the
        // push is the last mutation in `record`.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(RunId::new())
    }
}
