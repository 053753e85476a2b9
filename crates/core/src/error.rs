//! Error taxonomy for scenario execution

use thiserror::Error;

/// Result type alias for voltest-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while executing scenarios
///
/// `Command` and `AssertionFailed` abort only the current scenario and are
/// converted into a Failed outcome. `ResourceReleaseFailed` is never
/// propagated through a scenario: releases are best-effort and the failures
/// are aggregated by the executor. `NamingCollision` and `Internal` are
/// harness bugs and abort the whole run.
#[derive(Error, Debug)]
pub enum Error {
    /// A command failed or could not be spawned
    #[error(transparent)]
    Command(#[from] voltest_runner::Error),

    /// An assertion over captured output did not hold
    #[error("assertion failed: expected {expected}; got: {actual_excerpt}")]
    AssertionFailed {
        /// Human-readable description of what was expected
        expected: String,
        /// Excerpt of the actual output that was inspected
        actual_excerpt: String,
    },

    /// A resource's creation command failed
    #[error("failed to acquire {resource}: {cause}")]
    ResourceAcquireFailed {
        /// Identity of the resource that could not be acquired
        resource: String,
        /// Underlying cause
        cause: String,
    },

    /// A resource's teardown command failed (non-fatal, aggregated)
    #[error("failed to release {resource}: {cause}")]
    ResourceReleaseFailed {
        /// Identity of the resource that could not be released
        resource: String,
        /// Underlying cause
        cause: String,
    },

    /// Two resources were issued the same scoped name within one run
    #[error("resource name collision: {0}")]
    NamingCollision(String),

    /// A bug in the harness itself (registry misuse, missing parameter, ...)
    #[error("harness internal error: {0}")]
    Internal(String),

    /// The operator aborted the run
    #[error("run interrupted")]
    Interrupted,
}

impl Error {
    /// Create an assertion failure with a bounded excerpt of the output
    pub fn assertion(expected: impl Into<String>, actual: &str) -> Self {
        Self::AssertionFailed {
            expected: expected.into(),
            actual_excerpt: excerpt(actual),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Captured command output associated with this error, if any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::Command(err) => err.captured_output(),
            _ => None,
        }
    }
}

const EXCERPT_LIMIT: usize = 400;

fn excerpt(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.len() <= EXCERPT_LIMIT {
        trimmed.to_string()
    } else {
        let mut end = EXCERPT_LIMIT;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... ({} bytes total)", &trimmed[..end], trimmed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_output_untouched() {
        let err = Error::assertion("substring \"x\"", "short output\n");
        match err {
            Error::AssertionFailed { actual_excerpt, .. } => {
                assert_eq!(actual_excerpt, "short output");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_excerpt_truncates_long_output() {
        let long = "y".repeat(2000);
        let err = Error::assertion("substring \"x\"", &long);
        match err {
            Error::AssertionFailed { actual_excerpt, .. } => {
                assert!(actual_excerpt.len() < 500);
                assert!(actual_excerpt.contains("2000 bytes total"));
            }
            _ => unreachable!(),
        }
    }
}
