//! Scenario definitions and the context their bodies run against

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use voltest_runner::{Command, CommandResult, Runner};

use crate::error::{Error, Result};
use crate::executor::CancelToken;
use crate::naming::RunNamer;
use crate::resource::{ResourceSpec, ResourceStack};

/// The async body of a scenario
pub type ScenarioBody =
    Arc<dyn for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Key/value parameter bundle for a scenario
///
/// Parametrization replaces inheritance: the same body registered twice with
/// different bundles (e.g. a bare vs. a pool-qualified RBD image name) runs
/// the same logical test against two backing configurations.
#[derive(Debug, Clone, Default)]
pub struct ScenarioParams(HashMap<String, String>);

impl ScenarioParams {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, consuming and returning the bundle for chaining
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// A named test scenario: an async body plus its parameter bundle
#[derive(Clone)]
pub struct Scenario {
    name: String,
    params: ScenarioParams,
    body: ScenarioBody,
}

impl Scenario {
    /// Define a scenario from a closure returning a boxed future
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            params: ScenarioParams::new(),
            body: Arc::new(body),
        }
    }

    /// Attach a parameter bundle
    pub fn with_params(mut self, params: ScenarioParams) -> Self {
        self.params = params;
        self
    }

    /// The scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter bundle
    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub(crate) fn body(&self) -> ScenarioBody {
        Arc::clone(&self.body)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Everything a scenario body may interact with
///
/// Actions run strictly sequentially: each later action typically depends on
/// the side effect of an earlier one (a volume must exist before a container
/// mounts it). The context checks the cancel token before every action so an
/// operator abort stops the body at the next boundary while teardown still
/// runs.
pub struct ScenarioContext<'r> {
    runner: &'r Runner,
    namer: Arc<RunNamer>,
    params: ScenarioParams,
    cancel: CancelToken,
    worker: usize,
    pub(crate) resources: ResourceStack,
}

impl<'r> ScenarioContext<'r> {
    pub(crate) fn new(
        runner: &'r Runner,
        namer: Arc<RunNamer>,
        params: ScenarioParams,
        cancel: CancelToken,
        worker: usize,
    ) -> Self {
        Self {
            runner,
            namer,
            params,
            cancel,
            worker,
            resources: ResourceStack::new(),
        }
    }

    /// Run a command, expecting success
    pub async fn run(&mut self, command: Command) -> Result<CommandResult> {
        self.check_cancelled()?;
        Ok(self.runner.run(&command).await?)
    }

    /// Run a command without treating a non-zero exit as an error
    pub async fn run_unchecked(&mut self, command: Command) -> Result<CommandResult> {
        self.check_cancelled()?;
        Ok(self.runner.run_unchecked(&command).await?)
    }

    /// Acquire an external resource; it is released when the scenario ends
    pub async fn acquire(&mut self, spec: ResourceSpec) -> Result<String> {
        self.check_cancelled()?;
        self.resources.acquire(self.runner, spec).await
    }

    /// Release an acquired resource now instead of at scenario teardown
    pub async fn release(&mut self, identity: &str) -> Result<()> {
        self.check_cancelled()?;
        self.resources.release(self.runner, identity).await
    }

    /// Look up a required parameter
    pub fn param(&self, key: &str) -> Result<&str> {
        self.params
            .get(key)
            .ok_or_else(|| Error::internal(format!("missing scenario parameter `{key}`")))
    }

    /// Scope a base name to this run and this scenario's worker slot
    pub fn scoped_name(&self, base: &str) -> Result<String> {
        self.namer.scoped(base, self.worker)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}
