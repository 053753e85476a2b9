//! Blocking-style command runner over async process primitives

use std::time::Duration;

use async_io::Timer;
use async_process::{Child, Stdio};
use futures::StreamExt;
use futures_lite::FutureExt;
use futures_lite::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::output::CommandResult;

/// Default per-command timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Grace period between SIGTERM and SIGKILL when a command times out
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Executes host commands and captures their combined output
///
/// Every invocation is single-shot: the runner never retries. Each command is
/// bounded by the configured timeout; on expiry the child is terminated
/// (SIGTERM first, SIGKILL after a short grace period) and the invocation
/// fails with the timeout sub-kind of [`Error::CommandFailed`].
#[derive(Debug, Clone)]
pub struct Runner {
    timeout: Duration,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Create a runner with the default timeout
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a runner with a specific per-command timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-command timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a command, expecting it to succeed
    ///
    /// A non-zero exit is converted into [`Error::CommandFailed`] carrying
    /// the exit code and the captured output. Callers that expect a command
    /// to fail (e.g. an access-denied scenario) must use
    /// [`Runner::run_unchecked`] and inspect the result explicitly.
    pub async fn run(&self, command: &Command) -> Result<CommandResult> {
        let result = self.run_unchecked(command).await?;
        if result.succeeded() {
            Ok(result)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                exit_code: result.exit_code(),
                output: result.output().to_string(),
                timed_out: false,
            })
        }
    }

    /// Run a command and return the result regardless of its exit code
    ///
    /// Only spawn failures and timeouts are errors here.
    pub async fn run_unchecked(&self, command: &Command) -> Result<CommandResult> {
        debug!(command = %command, "running");

        let mut async_cmd = command.prepare();
        async_cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = async_cmd
            .spawn()
            .map_err(|e| Error::spawn_failed(command.to_string(), e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::spawn_failed(command.to_string(), "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::spawn_failed(command.to_string(), "stderr not captured"))?;

        let mut output = String::new();
        let waited = {
            let drive = async {
                // Interleave stdout and stderr lines as they arrive.
                let stdout_lines = BufReader::new(stdout).lines();
                let stderr_lines = BufReader::new(stderr).lines();
                let mut merged = futures::stream::select(stdout_lines, stderr_lines);
                while let Some(line) = merged.next().await {
                    match line {
                        Ok(line) => {
                            output.push_str(&line);
                            output.push('\n');
                        }
                        Err(_) => break,
                    }
                }
                Waited::Finished(child.status().await)
            };
            let deadline = async {
                Timer::after(self.timeout).await;
                Waited::TimedOut
            };
            drive.or(deadline).await
        };

        match waited {
            Waited::Finished(status) => {
                let status = status?;
                Ok(CommandResult::new(status.code(), output))
            }
            Waited::TimedOut => {
                warn!(command = %command, timeout = ?self.timeout, "command timed out, killing");
                reap(&mut child).await;
                Err(Error::CommandFailed {
                    command: command.to_string(),
                    exit_code: None,
                    output,
                    timed_out: true,
                })
            }
        }
    }
}

enum Waited {
    Finished(std::io::Result<std::process::ExitStatus>),
    TimedOut,
}

/// Best-effort termination of a timed-out child: SIGTERM, short grace, SIGKILL
async fn reap(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let pid = Pid::from_raw(child.id() as i32);
        let _ = signal::kill(pid, Signal::SIGTERM);
    }

    let exited = {
        let graceful = async { child.status().await.is_ok() };
        let expired = async {
            Timer::after(KILL_GRACE).await;
            false
        };
        graceful.or(expired).await
    };

    if !exited {
        let _ = child.kill();
        let _ = child.status().await;
    }
}
