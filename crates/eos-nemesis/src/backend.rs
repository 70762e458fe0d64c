//! Fault execution backends.
//!
//! The scheduler only decides and records intents. Turning an intent into
//! iptables rules or netem qdiscs on a real host is the job of a
//! [`FaultBackend`]. The bundled [`DryRunBackend`] renders the commands an
//! intent would need and logs them without running anything.

use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::action::FaultIntent;
use crate::error::{NemesisError, Result};

/// Executes fault intents against the cluster.
///
/// Implementations must be thread-safe: the scheduler may be shared across
/// tasks. Errors are reported back to the scheduler, which logs them and
/// carries on.
///
/// `apply` runs after the scheduler has released its state lock, so an
/// implementation may block on a slow command or call back into the
/// scheduler. It does hold up the caller, the nemesis loop included.
pub trait FaultBackend: Send + Sync {
    /// Returns the name of this backend for logging.
    fn name(&self) -> &str;

    /// Applies one intent.
    fn apply(&self, intent: &FaultIntent) -> Result<()>;
}

/// Helper for generating iptables commands.
pub(crate) struct IptablesCommand {
    /// The iptables binary (iptables or ip6tables).
    binary: &'static str,
    /// `-A` to append, `-D` to delete.
    action: &'static str,
}

impl IptablesCommand {
    /// Creates a new iptables command builder for `node`.
    pub fn for_node(node: &str) -> Self {
        let is_ipv6 = node.parse::<IpAddr>().map(|ip| ip.is_ipv6()).unwrap_or(false);
        Self {
            binary: if is_ipv6 { "ip6tables" } else { "iptables" },
            action: "-A",
        }
    }

    /// Sets to delete mode.
    pub fn delete(mut self) -> Self {
        self.action = "-D";
        self
    }

    /// Generates a DROP rule for traffic from a source.
    pub fn drop_from(&self, source: &str) -> String {
        format!("{} {} INPUT -s {} -j DROP", self.binary, self.action, source)
    }

    /// Generates a DROP rule for traffic to a destination.
    pub fn drop_to(&self, dest: &str) -> String {
        format!("{} {} OUTPUT -d {} -j DROP", self.binary, self.action, dest)
    }
}

/// Helper for generating tc (traffic control) commands.
pub(crate) struct TcCommand {
    /// Network interface.
    interface: String,
}

impl TcCommand {
    /// Creates a new tc command builder.
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
        }
    }

    /// Installs (or replaces) the root netem qdisc with a fixed delay.
    pub fn replace_netem_delay(&self, delay_ms: u64) -> String {
        format!(
            "tc qdisc replace dev {} root netem delay {}ms",
            self.interface, delay_ms
        )
    }
}

/// Renders the shell commands that would realise `intent`.
pub fn render_commands(intent: &FaultIntent, interface: &str) -> Result<Vec<String>> {
    let node = intent.target();
    if node.trim().is_empty() {
        return Err(NemesisError::InvalidTarget(node.to_string()));
    }

    let commands = match intent {
        FaultIntent::Partition { node } => {
            let iptables = IptablesCommand::for_node(node);
            vec![iptables.drop_from(node), iptables.drop_to(node)]
        }
        FaultIntent::Heal { node } => {
            let iptables = IptablesCommand::for_node(node).delete();
            vec![iptables.drop_from(node), iptables.drop_to(node)]
        }
        FaultIntent::SlowNetwork { delay_ms, .. } => {
            vec![TcCommand::new(interface).replace_netem_delay(*delay_ms)]
        }
    };

    Ok(commands)
}

/// Backend that renders and logs commands without executing them.
#[derive(Debug)]
pub struct DryRunBackend {
    interface: String,
    rendered: Mutex<Vec<String>>,
}

impl DryRunBackend {
    /// Creates a dry-run backend targeting `eth0`.
    pub fn new() -> Self {
        Self::with_interface("eth0")
    }

    /// Creates a dry-run backend for a specific interface.
    pub fn with_interface(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Every command rendered so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for DryRunBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultBackend for DryRunBackend {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn apply(&self, intent: &FaultIntent) -> Result<()> {
        let commands = render_commands(intent, &self.interface)?;
        for command in &commands {
            debug!(backend = self.name(), command = %command, "Would execute");
        }
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(commands);
        Ok(())
    }
}
