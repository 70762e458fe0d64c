//! EOS Checker - Exactly-once verification for recorded histories
//!
//! This crate inspects a completed history and reports two anomaly classes:
//!
//! - **duplicate delivery**: the same `(partition, key, offset)` was consumed
//!   more than once
//! - **out of order**: within a partition, a consume observed an offset lower
//!   than one observed earlier in index order
//!
//! Only successful consumes count as deliveries. Invocations, failed and
//! indeterminate consumes, and all produces are ignored.
//!
//! # Example
//!
//! ```
//! use eos_checker::{Checker, EosChecker};
//!
//! let result = EosChecker::new().check(&[]);
//! assert!(result.is_pass());
//! assert!(result.anomalies.is_empty());
//! ```

pub mod eos;
pub mod result;
pub mod traits;

pub use eos::{check, Delivery, EosChecker};
pub use result::{Anomaly, AnomalyType, CheckResult, CheckStats};
pub use traits::Checker;

// Re-export core types for convenience
pub use eos_core::{OpFunction, OpKind, Operation};
