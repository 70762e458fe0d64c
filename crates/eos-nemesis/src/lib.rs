//! # EOS Nemesis - Fault Scheduling
//!
//! The nemesis decides which network fault to inject next, tracks which
//! nodes it believes are partitioned, and keeps an audit log of every
//! decision. It does not touch the network itself: each decision is handed
//! to a [`FaultBackend`] as a [`FaultIntent`].
//!
//! ## Primitives
//!
//! - [`FaultScheduler::inject_partition`]: add a node to the partitioned set
//! - [`FaultScheduler::heal_partition`]: remove a node from the set
//! - [`FaultScheduler::inject_slow_network`]: add latency (state unchanged)
//! - [`FaultScheduler::random_fault`]: randomized policy over the above
//! - [`FaultScheduler::heal_all`]: teardown cleanup
//!
//! Every primitive is idempotent on state and always appends a log entry.
//!
//! ## Quick Start
//!
//! ```
//! use eos_nemesis::{ActionType, FaultScheduler};
//!
//! let scheduler = FaultScheduler::with_seed(["10.0.0.1", "10.0.0.2"], 42);
//!
//! scheduler.inject_partition("10.0.0.1");
//! assert!(scheduler.is_partitioned("10.0.0.1"));
//!
//! let heals = scheduler.heal_all();
//! assert_eq!(heals[0].action_type, ActionType::Heal);
//! assert!(scheduler.partitioned().is_empty());
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod backend;
pub mod error;
pub mod scheduler;

pub use action::{ActionType, FaultIntent, NemesisAction};
pub use backend::{render_commands, DryRunBackend, FaultBackend};
pub use error::{NemesisError, Result};
pub use scheduler::{FaultScheduler, SchedulerConfig};
