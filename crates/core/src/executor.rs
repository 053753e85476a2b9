//! Scenario execution with guaranteed teardown

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info};
use voltest_runner::Runner;

use crate::error::Error;
use crate::naming::RunNamer;
use crate::resource::ResourceRecord;
use crate::scenario::{Scenario, ScenarioContext};

/// Shared flag for operator abort
///
/// Checked by every scenario context before each action; setting it stops
/// running scenarios at their next action boundary. Teardown still runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Every action and assertion succeeded and teardown was clean
    Passed,
    /// A command or assertion failed; the system under test is wrong
    Failed(String),
    /// The harness itself could not run or clean up the scenario
    Errored(String),
}

impl Outcome {
    /// Short label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed(_) => "FAILED",
            Self::Errored(_) => "ERRORED",
        }
    }

    /// The failure or error reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed(reason) | Self::Errored(reason) => Some(reason),
        }
    }
}

/// Result of executing one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Final outcome
    pub outcome: Outcome,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Every resource the scenario touched, with its final state
    pub resources: Vec<ResourceRecord>,
    /// Identities of leaked resources needing manual cleanup
    pub leaked: Vec<String>,
    /// Captured output of the failing command, when the failure carries one
    pub failure_output: Option<String>,
}

/// Runs scenarios, guaranteeing teardown on every exit path
///
/// The body is wrapped in `catch_unwind` so a panicking assertion macro
/// cannot skip cleanup; leaked containers, devices and mounts would corrupt
/// subsequent runs.
pub struct Executor {
    runner: Runner,
    namer: Arc<RunNamer>,
    cancel: CancelToken,
}

impl Executor {
    /// Create an executor
    pub fn new(runner: Runner, namer: Arc<RunNamer>, cancel: CancelToken) -> Self {
        Self {
            runner,
            namer,
            cancel,
        }
    }

    /// The cancel token scenarios observe
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// The underlying runner
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Execute one scenario to a report; `worker` disambiguates resource
    /// names across parallel scenarios
    pub async fn execute(&self, scenario: &Scenario, worker: usize) -> ScenarioReport {
        info!(scenario = scenario.name(), "starting");
        let start = Instant::now();

        let mut ctx = ScenarioContext::new(
            &self.runner,
            Arc::clone(&self.namer),
            scenario.params().clone(),
            self.cancel.clone(),
            worker,
        );

        let body = scenario.body();
        let body_result = if self.cancel.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            match AssertUnwindSafe(body(&mut ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(Error::internal(format!(
                    "scenario panicked: {}",
                    panic_message(&panic)
                ))),
            }
        };

        // Teardown is never skipped, whatever the body did.
        let release_failures = ctx.resources.release_all(&self.runner).await;

        let failure_output = match &body_result {
            Err(e) => e.captured_output().map(str::to_string),
            Ok(()) => None,
        };
        let outcome = classify(body_result, &release_failures);
        match &outcome {
            Outcome::Passed => info!(scenario = scenario.name(), "passed"),
            Outcome::Failed(reason) => error!(scenario = scenario.name(), %reason, "failed"),
            Outcome::Errored(reason) => error!(scenario = scenario.name(), %reason, "errored"),
        }

        ScenarioReport {
            name: scenario.name().to_string(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
            resources: ctx.resources.records(),
            leaked: ctx.resources.leaked(),
            failure_output,
        }
    }
}

/// Map the body result and teardown failures to an outcome
///
/// A teardown failure is an Errored outcome even when the body passed:
/// reporters must be able to distinguish "the system under test is wrong"
/// from "the harness could not clean up".
fn classify(body_result: crate::error::Result<()>, release_failures: &[Error]) -> Outcome {
    let cleanup = release_failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");

    match (body_result, release_failures.is_empty()) {
        (Ok(()), true) => Outcome::Passed,
        (Ok(()), false) => Outcome::Errored(format!("teardown failed: {cleanup}")),
        (Err(Error::Interrupted), true) => Outcome::Errored("interrupted".to_string()),
        (Err(Error::Interrupted), false) => {
            Outcome::Errored(format!("interrupted; teardown failed: {cleanup}"))
        }
        // Harness bugs are never the system under test's fault.
        (Err(e @ (Error::Internal(_) | Error::NamingCollision(_))), true) => {
            Outcome::Errored(e.to_string())
        }
        (Err(e @ (Error::Internal(_) | Error::NamingCollision(_))), false) => {
            Outcome::Errored(format!("{e}; teardown failed: {cleanup}"))
        }
        (Err(e), true) => Outcome::Failed(e.to_string()),
        (Err(e), false) => Outcome::Errored(format!("{e}; teardown failed: {cleanup}")),
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
