//! The fault scheduler.
//!
//! [`FaultScheduler`] owns the set of nodes currently believed partitioned
//! and the ordered log of every decision it has taken. All mutation goes
//! through one mutex, so the scheduler can be shared between the
//! orchestrator loop and any other task. Intents reach the
//! [`FaultBackend`] only after that mutex is released.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::action::{FaultIntent, NemesisAction};
use crate::backend::{DryRunBackend, FaultBackend};

/// Fault kinds the random policy draws from, uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultKind {
    Partition,
    SlowNetwork,
    Heal,
}

const FAULT_KINDS: [FaultKind; 3] = [FaultKind::Partition, FaultKind::SlowNetwork, FaultKind::Heal];

/// Delay parameters for latency faults.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay used when a caller does not specify one.
    pub default_delay_ms: u64,
    /// Inclusive lower bound of randomly chosen delays.
    pub min_random_delay_ms: u64,
    /// Inclusive upper bound of randomly chosen delays.
    pub max_random_delay_ms: u64,
    /// Delay injected when the heal branch finds nothing to heal.
    pub fallback_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 200,
            min_random_delay_ms: 50,
            max_random_delay_ms: 500,
            fallback_delay_ms: 100,
        }
    }
}

/// A logged action and the intent still to be handed to the backend.
type Decision = (NemesisAction, FaultIntent);

struct SchedulerState {
    partitioned: BTreeSet<String>,
    actions: Vec<NemesisAction>,
    rng: StdRng,
}

/// Schedules and records network faults against a fixed set of nodes.
pub struct FaultScheduler {
    node_ips: Vec<String>,
    config: SchedulerConfig,
    backend: Arc<dyn FaultBackend>,
    state: Mutex<SchedulerState>,
}

impl FaultScheduler {
    /// Creates a scheduler with an entropy-seeded RNG and a dry-run backend.
    ///
    /// Blank entries in `node_ips` are dropped.
    pub fn new<I, S>(node_ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_seed(node_ips, rand::thread_rng().r#gen())
    }

    /// Creates a scheduler whose random decisions are reproducible.
    pub fn with_seed<I, S>(node_ips: I, seed: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node_ips: Vec<String> = node_ips
            .into_iter()
            .map(Into::into)
            .map(|ip: String| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .collect();

        Self {
            node_ips,
            config: SchedulerConfig::default(),
            backend: Arc::new(DryRunBackend::new()),
            state: Mutex::new(SchedulerState {
                partitioned: BTreeSet::new(),
                actions: Vec::new(),
                rng: StdRng::seed_from_u64(seed),
            }),
        }
    }

    /// Sets the delay configuration. An inverted random-delay range is
    /// swapped so that `min_random_delay_ms <= max_random_delay_ms`.
    pub fn with_config(mut self, mut config: SchedulerConfig) -> Self {
        if config.min_random_delay_ms > config.max_random_delay_ms {
            warn!(
                min = config.min_random_delay_ms,
                max = config.max_random_delay_ms,
                "Random delay bounds inverted, swapping"
            );
            std::mem::swap(&mut config.min_random_delay_ms, &mut config.max_random_delay_ms);
        }
        self.config = config;
        self
    }

    /// Sets the backend intents are handed to.
    pub fn with_backend(mut self, backend: Arc<dyn FaultBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// The active delay configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Isolates `node`. Re-partitioning is a no-op on state but still logged.
    pub fn inject_partition(&self, node: &str) -> NemesisAction {
        let decision = self.partition_locked(&mut self.lock(), node);
        self.apply(decision)
    }

    /// Heals `node`. Healing a healthy node is a no-op on state but still logged.
    pub fn heal_partition(&self, node: &str) -> NemesisAction {
        let decision = self.heal_locked(&mut self.lock(), node);
        self.apply(decision)
    }

    /// Adds latency to `node`, `delay_ms` defaulting to the configured 200ms.
    ///
    /// Never changes the partitioned set.
    pub fn inject_slow_network(&self, node: &str, delay_ms: Option<u64>) -> NemesisAction {
        let delay_ms = delay_ms.unwrap_or(self.config.default_delay_ms);
        let decision = self.slow_locked(&mut self.lock(), node, delay_ms);
        self.apply(decision)
    }

    /// Picks and injects a random fault.
    ///
    /// A target node and a fault kind are drawn uniformly. Choosing
    /// `partition` for a node that is already partitioned falls through to
    /// the heal branch: heal a random partitioned node, or add the fallback
    /// delay to the target when nothing is partitioned.
    pub fn random_fault(&self) -> NemesisAction {
        let decision = {
            let mut state = self.lock();

            if self.node_ips.is_empty() {
                let action = NemesisAction::noop("No nodes available");
                debug!("No fault targets configured, recording noop");
                state.actions.push(action.clone());
                return action;
            }

            let target = self
                .node_ips
                .choose(&mut state.rng)
                .cloned()
                .unwrap_or_default();
            let kind = *FAULT_KINDS.choose(&mut state.rng).unwrap_or(&FaultKind::Heal);

            match kind {
                FaultKind::Partition if !state.partitioned.contains(&target) => {
                    self.partition_locked(&mut state, &target)
                }
                FaultKind::SlowNetwork => {
                    let delay_ms = state
                        .rng
                        .gen_range(self.config.min_random_delay_ms..=self.config.max_random_delay_ms);
                    self.slow_locked(&mut state, &target, delay_ms)
                }
                _ => {
                    let state_ref = &mut *state;
                    let victim = state_ref
                        .partitioned
                        .iter()
                        .choose(&mut state_ref.rng)
                        .cloned();
                    match victim {
                        Some(victim) => self.heal_locked(&mut state, &victim),
                        None => {
                            let delay_ms = self.config.fallback_delay_ms;
                            self.slow_locked(&mut state, &target, delay_ms)
                        }
                    }
                }
            }
        };
        self.apply(decision)
    }

    /// Heals every partitioned node and returns the heal actions.
    pub fn heal_all(&self) -> Vec<NemesisAction> {
        let decisions: Vec<Decision> = {
            let mut state = self.lock();
            let snapshot: Vec<String> = state.partitioned.iter().cloned().collect();
            if !snapshot.is_empty() {
                info!(count = snapshot.len(), "Healing all partitioned nodes");
            }
            snapshot
                .iter()
                .map(|node| self.heal_locked(&mut state, node))
                .collect()
        };
        decisions.into_iter().map(|d| self.apply(d)).collect()
    }

    /// Nodes currently believed partitioned, sorted.
    pub fn partitioned(&self) -> Vec<String> {
        self.lock().partitioned.iter().cloned().collect()
    }

    /// Returns true if `node` is currently partitioned.
    pub fn is_partitioned(&self, node: &str) -> bool {
        self.lock().partitioned.contains(node)
    }

    /// The full ordered action log.
    pub fn actions(&self) -> Vec<NemesisAction> {
        self.lock().actions.clone()
    }

    /// Number of logged actions.
    pub fn action_count(&self) -> usize {
        self.lock().actions.len()
    }

    /// Nodes eligible for fault injection.
    pub fn node_ips(&self) -> &[String] {
        &self.node_ips
    }

    fn partition_locked(&self, state: &mut SchedulerState, node: &str) -> Decision {
        let decision = Self::record(state, FaultIntent::Partition { node: node.to_string() });
        state.partitioned.insert(node.to_string());
        info!(node = %node, "NEMESIS: Partitioned node");
        decision
    }

    fn heal_locked(&self, state: &mut SchedulerState, node: &str) -> Decision {
        let decision = Self::record(state, FaultIntent::Heal { node: node.to_string() });
        state.partitioned.remove(node);
        info!(node = %node, "NEMESIS: Healed node");
        decision
    }

    fn slow_locked(&self, state: &mut SchedulerState, node: &str, delay_ms: u64) -> Decision {
        let decision = Self::record(
            state,
            FaultIntent::SlowNetwork {
                node: node.to_string(),
                delay_ms,
            },
        );
        info!(node = %node, delay_ms, "NEMESIS: Slowed node");
        decision
    }

    /// Appends the action to the log. The backend is not touched here.
    fn record(state: &mut SchedulerState, intent: FaultIntent) -> Decision {
        let action = NemesisAction::from_intent(&intent);
        state.actions.push(action.clone());
        (action, intent)
    }

    /// Hands a recorded intent to the backend. Must be called with the state
    /// lock released.
    fn apply(&self, (action, intent): Decision) -> NemesisAction {
        if let Err(e) = self.backend.apply(&intent) {
            warn!(
                backend = self.backend.name(),
                action = %intent.action_type(),
                node = %intent.target(),
                error = %e,
                "Fault backend failed, recording intent anyway"
            );
        }
        action
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FaultScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultScheduler")
            .field("node_ips", &self.node_ips)
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
