//! Aggregated suite results

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::executor::{Outcome, ScenarioReport};

/// Aggregated results of one suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// When the suite started
    pub started_at: DateTime<Utc>,
    /// When the suite finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-scenario reports, in completion order
    pub scenarios: Vec<ScenarioReport>,
    /// Suite-fixture identities that could not be released
    pub fixture_leaks: Vec<String>,
}

impl Default for SuiteReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SuiteReport {
    /// Create an empty report stamped with the current time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            scenarios: Vec::new(),
            fixture_leaks: Vec::new(),
        }
    }

    /// Append one scenario's report
    pub fn push(&mut self, scenario: ScenarioReport) {
        self.scenarios.push(scenario);
    }

    /// Record fixtures left behind for manual cleanup
    pub fn record_fixture_leaks(&mut self, leaks: Vec<String>) {
        self.fixture_leaks.extend(leaks);
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of passed scenarios
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    /// Number of failed scenarios
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Number of errored scenarios
    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Errored(_)))
    }

    /// Whether every scenario passed and no fixture leaked
    pub fn all_passed(&self) -> bool {
        self.failed() == 0 && self.errored() == 0 && self.fixture_leaks.is_empty()
    }

    /// Every leaked resource identity across scenarios and fixtures
    pub fn leaked_resources(&self) -> Vec<&str> {
        self.scenarios
            .iter()
            .flat_map(|s| s.leaked.iter().map(String::as_str))
            .chain(self.fixture_leaks.iter().map(String::as_str))
            .collect()
    }

    /// Process exit code: 0 all-pass, 1 any failure, 2 any harness error
    pub fn exit_code(&self) -> i32 {
        if self.errored() > 0 || !self.fixture_leaks.is_empty() {
            2
        } else if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.scenarios.iter().filter(|s| pred(&s.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(outcomes: Vec<Outcome>) -> SuiteReport {
        let mut report = SuiteReport::new();
        for (i, outcome) in outcomes.into_iter().enumerate() {
            report.push(ScenarioReport {
                name: format!("scenario-{i}"),
                outcome,
                duration_ms: 1,
                resources: Vec::new(),
                leaked: Vec::new(),
                failure_output: None,
            });
        }
        report.finish();
        report
    }

    #[test]
    fn test_exit_code_all_passed() {
        let report = report_with(vec![Outcome::Passed, Outcome::Passed]);
        assert!(report.all_passed());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_any_failed() {
        let report = report_with(vec![Outcome::Passed, Outcome::Failed("boom".into())]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_errored_outranks_failed() {
        let report = report_with(vec![
            Outcome::Failed("assert".into()),
            Outcome::Errored("teardown".into()),
        ]);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_fixture_leak_is_a_harness_error() {
        let mut report = report_with(vec![Outcome::Passed]);
        report.record_fixture_leaks(vec!["nfs-server-abc".into()]);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.leaked_resources(), vec!["nfs-server-abc"]);
    }
}
