//! Nemesis action records and fault intents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of fault-injection decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Isolate a node.
    Partition,
    /// Remove a node's isolation.
    Heal,
    /// Add latency to a node's network.
    SlowNetwork,
    /// Nothing was done.
    Noop,
}

impl ActionType {
    /// The snake_case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Partition => "partition",
            Self::Heal => "heal",
            Self::SlowNetwork => "slow_network",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of one fault-injection decision.
///
/// Created once per primitive invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NemesisAction {
    /// When the decision was taken.
    pub timestamp: DateTime<Utc>,
    /// What kind of fault.
    pub action_type: ActionType,
    /// Human-readable description.
    pub description: String,
    /// Node the fault targets; empty for `noop`.
    pub target: String,
}

impl NemesisAction {
    /// Builds the record for an intent, stamped now.
    pub fn from_intent(intent: &FaultIntent) -> Self {
        Self {
            timestamp: Utc::now(),
            action_type: intent.action_type(),
            description: intent.describe(),
            target: intent.target().to_string(),
        }
    }

    /// A `noop` record.
    pub fn noop(reason: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action_type: ActionType::Noop,
            description: reason.into(),
            target: String::new(),
        }
    }
}

impl fmt::Display for NemesisAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.action_type, self.description)
    }
}

/// What a backend is asked to apply.
///
/// Carries the parameters the audit record only describes in prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultIntent {
    /// Drop all traffic to and from `node`.
    Partition {
        /// Node address.
        node: String,
    },
    /// Restore traffic for `node`.
    Heal {
        /// Node address.
        node: String,
    },
    /// Delay `node`'s traffic by `delay_ms`.
    SlowNetwork {
        /// Node address.
        node: String,
        /// Added latency in milliseconds.
        delay_ms: u64,
    },
}

impl FaultIntent {
    /// The action type this intent is logged as.
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Partition { .. } => ActionType::Partition,
            Self::Heal { .. } => ActionType::Heal,
            Self::SlowNetwork { .. } => ActionType::SlowNetwork,
        }
    }

    /// The targeted node.
    pub fn target(&self) -> &str {
        match self {
            Self::Partition { node } | Self::Heal { node } | Self::SlowNetwork { node, .. } => {
                node
            }
        }
    }

    /// Human-readable description used in the action log.
    pub fn describe(&self) -> String {
        match self {
            Self::Partition { node } => format!("Isolating node {} with iptables DROP", node),
            Self::Heal { node } => format!("Healing partition for {}", node),
            Self::SlowNetwork { node, delay_ms } => {
                format!("Adding {}ms delay to {}", delay_ms, node)
            }
        }
    }
}
