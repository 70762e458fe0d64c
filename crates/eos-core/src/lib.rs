//! EOS Core - Core types for the exactly-once verification harness.
//!
//! This crate provides the fundamental types shared by the workload, the
//! checker and the test runner:
//!
//! - [`node`]: Logical actor identification (`ProcessId`)
//! - [`operation`]: Operation records (`Operation`, `OpKind`, `OpFunction`)
//! - [`history`]: The append-only, thread-safe history store
//!
//! # Overview
//!
//! Every produce or consume attempt issued by the workload is recorded as an
//! `invoke` followed by a completion (`ok`, `fail` or `info`). The history
//! assigns each record a global, gap-free index under mutual exclusion, so
//! the index order is the authoritative sequencing the checker relies on.
//!
//! # Example
//!
//! ```
//! use eos_core::history::{History, RunId};
//! use eos_core::node::ProcessId;
//! use eos_core::operation::{OpFunction, OpKind, Payload};
//!
//! let history = History::new(RunId::new());
//!
//! let invoke = history.record(OpKind::Invoke, OpFunction::Produce, Payload::new(), ProcessId(0));
//! let ok = history.record(OpKind::Ok, OpFunction::Produce, Payload::new(), ProcessId(0));
//!
//! assert_eq!(invoke.index, 1);
//! assert_eq!(ok.index, 2);
//! assert_eq!(history.len(), 2);
//! ```

pub mod history;
pub mod node;
pub mod operation;

pub use history::{History, OpCounts, RunId};
pub use node::ProcessId;
pub use operation::{OpFunction, OpKind, Operation, Payload};
