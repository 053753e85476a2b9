//! Error types for command execution

use thiserror::Error;

/// Unified error type for command execution
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn `{command}`: {reason}")]
    SpawnFailed {
        /// The command that could not be spawned
        command: String,
        /// The reason for the spawn failure
        reason: String,
    },

    /// A command exited non-zero when success was expected, or was aborted
    /// because it exceeded the runner's timeout
    #[error("command `{command}` {}", failure_kind(*.timed_out, *.exit_code))]
    CommandFailed {
        /// The command that failed
        command: String,
        /// Exit code, if the process exited on its own
        exit_code: Option<i32>,
        /// Combined stdout+stderr captured before the failure
        output: String,
        /// True when the command was killed after exceeding the timeout
        timed_out: bool,
    },

    /// I/O error while driving the child process
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn failure_kind(timed_out: bool, exit_code: Option<i32>) -> String {
    if timed_out {
        "timed out".to_string()
    } else {
        match exit_code {
            Some(code) => format!("exited with code {code}"),
            None => "was terminated by a signal".to_string(),
        }
    }
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// True for the timeout sub-kind of a command failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CommandFailed { timed_out: true, .. })
    }

    /// Captured output of a failed command, if any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
