//! Captured result of a finished command

/// The outcome of one command invocation
///
/// Holds the exit code and the combined stdout+stderr text, interleaved in
/// the order the OS delivered the lines. Immutable once produced; all
/// matching and parsing over the output is read-only.
#[derive(Debug, Clone)]
pub struct CommandResult {
    exit_code: Option<i32>,
    output: String,
}

impl CommandResult {
    /// Build a result from an exit code and captured output
    ///
    /// Exposed so matcher tests and fakes can construct results; the runner
    /// is the only producer in normal operation.
    pub fn new(exit_code: Option<i32>, output: String) -> Self {
        Self { exit_code, output }
    }

    /// Exit code of the process, absent when it was killed by a signal
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Combined stdout+stderr captured from the process
    pub fn output(&self) -> &str {
        &self.output
    }

    /// True iff the process exited with code 0
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded() {
        assert!(CommandResult::new(Some(0), String::new()).succeeded());
        assert!(!CommandResult::new(Some(1), String::new()).succeeded());
        assert!(!CommandResult::new(None, String::new()).succeeded());
    }
}
