//! Error types for fault execution backends.

use thiserror::Error;

/// Result type alias for nemesis backend operations.
pub type Result<T> = std::result::Result<T, NemesisError>;

/// Errors a [`FaultBackend`](crate::backend::FaultBackend) may report.
///
/// The scheduler never propagates these: a failed backend call is logged and
/// the action is still recorded.
#[derive(Debug, Error)]
pub enum NemesisError {
    /// The fault target is empty or unusable.
    #[error("Invalid target: {0:?}")]
    InvalidTarget(String),

    /// A command execution failed.
    #[error("Command failed: {command} - {reason}")]
    CommandFailed {
        /// The command that was run.
        command: String,
        /// Why it failed.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NemesisError {
    /// Creates a new command failed error.
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
