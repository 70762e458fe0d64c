//! The aggregate outcome of a run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use eos_checker::{Anomaly, AnomalyType};
use eos_core::{OpCounts, Operation, RunId};
use eos_nemesis::{ActionType, NemesisAction};
use eos_workload::WorkloadStats;

/// Final result of one run. Built once at the end and never mutated.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Run identifier shared with the history.
    pub run_id: RunId,
    /// Test name.
    pub name: String,
    /// True iff the checker found no anomalies.
    pub passed: bool,
    /// Operations recorded.
    pub total_ops: usize,
    /// `ok` completions.
    pub ok_ops: usize,
    /// `fail` completions.
    pub fail_ops: usize,
    /// `info` completions.
    pub info_ops: usize,
    /// Elapsed time from start to verdict.
    pub duration: Duration,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Full history in index order.
    pub history: Vec<Operation>,
    /// Full nemesis log, teardown heals included.
    pub nemesis_actions: Vec<NemesisAction>,
    /// Length of the log before the teardown heals were appended.
    pub scheduled_actions: usize,
    /// Every anomaly the checker reported.
    pub anomalies: Vec<Anomaly>,
    /// Workload counters.
    pub workload: WorkloadStats,
}

impl TestResult {
    /// Counts by kind, recomputed from the history.
    pub fn counts(&self) -> OpCounts {
        OpCounts::from_operations(&self.history)
    }

    /// Nemesis actions of one type.
    pub fn actions_of(&self, action_type: ActionType) -> usize {
        self.nemesis_actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }

    /// Actions appended by the teardown `heal_all`.
    pub fn teardown_actions(&self) -> &[NemesisAction] {
        let split = self.scheduled_actions.min(self.nemesis_actions.len());
        &self.nemesis_actions[split..]
    }

    /// Anomalies of one type.
    pub fn anomalies_of(&self, anomaly_type: AnomalyType) -> usize {
        self.anomalies
            .iter()
            .filter(|a| a.anomaly_type == anomaly_type)
            .count()
    }

    /// Process exit code: 0 on pass, 1 on fail.
    pub fn exit_code(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }
}
