//! Core trait for history checkers.

use eos_core::Operation;

use crate::CheckResult;

/// A checker that validates a completed history.
///
/// Checkers are pure: they never mutate the history and produce a fresh
/// result on every call.
///
/// # Example
///
/// ```rust
/// use eos_checker::{CheckResult, Checker};
/// use eos_core::Operation;
///
/// struct AlwaysPass;
///
/// impl Checker for AlwaysPass {
///     fn name(&self) -> &str {
///         "always-pass"
///     }
///
///     fn check(&self, _history: &[Operation]) -> CheckResult {
///         CheckResult::from_anomalies(Vec::new())
///     }
/// }
///
/// assert!(AlwaysPass.check(&[]).is_pass());
/// ```
pub trait Checker: Send + Sync {
    /// Returns the name of this checker for logging.
    fn name(&self) -> &str;

    /// Check the entire history.
    fn check(&self, history: &[Operation]) -> CheckResult;

    /// Get a description of what this checker validates.
    fn description(&self) -> &str {
        "No description available"
    }
}
