//! Scenario registration and suite execution

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::report::SuiteReport;
use crate::resource::{ResourceSpec, ResourceStack};
use crate::scenario::Scenario;

/// Registry of scenarios making up one suite
///
/// Scenarios run in registration order (subject to parallelism). Fixtures are
/// suite-scoped shared resources: acquired once before the first scenario,
/// released after the last one, in LIFO order like everything else.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    scenarios: IndexMap<String, Scenario>,
    fixtures: Vec<ResourceSpec>,
}

impl SuiteRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario; names must be unique within the suite
    pub fn register(&mut self, scenario: Scenario) -> Result<()> {
        let name = scenario.name().to_string();
        if self.scenarios.insert(name.clone(), scenario).is_some() {
            return Err(Error::internal(format!(
                "scenario `{name}` registered twice"
            )));
        }
        Ok(())
    }

    /// Register a suite-scoped shared resource
    pub fn add_fixture(&mut self, spec: ResourceSpec) {
        self.fixtures.push(spec);
    }

    /// Number of registered scenarios
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether no scenarios are registered
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Registered scenario names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    /// Run every scenario whose name contains `filter` (all when `None`)
    ///
    /// `parallelism` bounds the number of concurrently executing scenarios;
    /// per-run resource naming keeps them from colliding on shared external
    /// state. Fixture acquisition failure aborts the run before any scenario
    /// starts, after releasing the fixtures that did come up; fixture release
    /// failures are appended to the report as leaked resources.
    pub async fn run(
        &self,
        executor: &Executor,
        parallelism: usize,
        filter: Option<&str>,
    ) -> Result<SuiteReport> {
        let selected: Vec<(usize, &Scenario)> = self
            .scenarios
            .values()
            .filter(|s| filter.is_none_or(|f| s.name().contains(f)))
            .enumerate()
            .collect();
        info!(
            selected = selected.len(),
            registered = self.scenarios.len(),
            "running suite"
        );

        let mut fixture_stack = ResourceStack::new();
        for spec in &self.fixtures {
            if let Err(acquire_err) = fixture_stack.acquire(executor.runner(), spec.clone()).await
            {
                // Earlier fixtures may already be Active and must not be
                // stranded because a later one failed to come up.
                let release_failures = fixture_stack.release_all(executor.runner()).await;
                for failure in &release_failures {
                    warn!(error = %failure, "fixture release failed");
                }
                let leaked = fixture_stack.leaked();
                if leaked.is_empty() {
                    return Err(acquire_err);
                }
                return Err(Error::internal(format!(
                    "{acquire_err}; leaked fixtures: {}",
                    leaked.join(", ")
                )));
            }
        }

        let parallelism = parallelism.max(1);
        let mut report = SuiteReport::new();
        let mut pending = selected.into_iter();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < parallelism {
                match pending.next() {
                    Some((worker, scenario)) => {
                        in_flight.push(executor.execute(scenario, worker))
                    }
                    None => break,
                }
            }
            match in_flight.next().await {
                Some(scenario_report) => report.push(scenario_report),
                None => break,
            }
        }

        let release_failures = fixture_stack.release_all(executor.runner()).await;
        for failure in &release_failures {
            warn!(error = %failure, "fixture release failed");
        }
        report.record_fixture_leaks(fixture_stack.leaked());

        report.finish();
        Ok(report)
    }
}
