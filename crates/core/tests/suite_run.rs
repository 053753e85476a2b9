//! Tests for suite registration, parametrization and reporting

use std::sync::Arc;

use voltest_core::{
    CancelToken, Error, Executor, ResourceKind, ResourceSpec, RunNamer, Scenario, ScenarioParams,
    SuiteRegistry,
};
use voltest_runner::{Command, Runner};

fn executor() -> Executor {
    Executor::new(
        Runner::new(),
        Arc::new(RunNamer::generate()),
        CancelToken::new(),
    )
}

fn passing(name: &str) -> Scenario {
    Scenario::new(name, |ctx| {
        Box::pin(async move {
            ctx.run(Command::new("true")).await?;
            Ok(())
        })
    })
}

fn failing(name: &str) -> Scenario {
    Scenario::new(name, |ctx| {
        Box::pin(async move {
            ctx.run(Command::new("false")).await?;
            Ok(())
        })
    })
}

/// Body shared by the parametrized image scenarios: acquires a volume whose
/// name comes from the `image` parameter.
fn volume_scenario(name: &str, image: &str) -> Scenario {
    Scenario::new(name, |ctx| {
        Box::pin(async move {
            let base = ctx.param("image")?.to_string();
            let volume = ctx.scoped_name(&base)?;
            ctx.acquire(ResourceSpec::new(
                ResourceKind::BlockImage,
                volume,
                Command::new("true"),
            ))
            .await?;
            Ok(())
        })
    })
    .with_params(ScenarioParams::new().with("image", image))
}

#[test]
fn test_parametrized_scenarios_get_independent_identities() {
    futures::executor::block_on(async {
        let mut suite = SuiteRegistry::new();
        suite
            .register(volume_scenario("volume (default pool)", "docker-test-volume"))
            .unwrap();
        suite
            .register(volume_scenario(
                "volume (named pool)",
                "rbd/docker-test-volume",
            ))
            .unwrap();

        let report = suite.run(&executor(), 1, None).await.unwrap();

        assert_eq!(report.passed(), 2);
        let identities: Vec<&str> = report
            .scenarios
            .iter()
            .flat_map(|s| s.resources.iter().map(|r| r.identity.as_str()))
            .collect();
        assert_eq!(identities.len(), 2);
        assert_ne!(identities[0], identities[1]);
    });
}

#[test]
fn test_filter_selects_by_substring() {
    futures::executor::block_on(async {
        let mut suite = SuiteRegistry::new();
        suite.register(passing("ceph volume")).unwrap();
        suite.register(passing("nfs export")).unwrap();
        suite.register(passing("ceph resize")).unwrap();

        let report = suite.run(&executor(), 1, Some("ceph")).await.unwrap();

        assert_eq!(report.scenarios.len(), 2);
        assert!(report.scenarios.iter().all(|s| s.name.contains("ceph")));
    });
}

#[test]
fn test_duplicate_registration_rejected() {
    let mut suite = SuiteRegistry::new();
    suite.register(passing("unique")).unwrap();
    let err = suite.register(passing("unique")).unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
}

#[test]
fn test_exit_code_reflects_failures() {
    futures::executor::block_on(async {
        let mut suite = SuiteRegistry::new();
        suite.register(passing("works")).unwrap();
        suite.register(failing("broken")).unwrap();

        let report = suite.run(&executor(), 1, None).await.unwrap();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 1);
    });
}

#[test]
fn test_parallel_execution_completes_all() {
    futures::executor::block_on(async {
        let mut suite = SuiteRegistry::new();
        for i in 0..4 {
            let name = format!("concurrent scenario {i}");
            suite
                .register(Scenario::new(name, |ctx| {
                    Box::pin(async move {
                        let volume = ctx.scoped_name("shared-base-name")?;
                        ctx.acquire(ResourceSpec::new(
                            ResourceKind::Container,
                            volume,
                            Command::new("true"),
                        ))
                        .await?;
                        ctx.run(Command::builder("sleep").arg("0.1").build()).await?;
                        Ok(())
                    })
                }))
                .unwrap();
        }

        let report = suite.run(&executor(), 4, None).await.unwrap();

        // Same base name in every scenario: worker-scoped naming keeps the
        // four resources distinct.
        assert_eq!(report.passed(), 4);
        assert_eq!(report.exit_code(), 0);
    });
}

#[test]
fn test_fixture_lifecycle_wraps_scenarios() {
    futures::executor::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("fixture.log");
        let log_path = log.to_string_lossy().to_string();

        let mut suite = SuiteRegistry::new();
        suite.add_fixture(
            ResourceSpec::new(
                ResourceKind::NetworkEndpoint,
                "nfs-server",
                Command::shell(format!("echo stopped >> {log_path}")),
            )
            .create_with(Command::shell(format!("echo started >> {log_path}"))),
        );
        let check_path = log_path.clone();
        suite
            .register(Scenario::new("uses fixture", move |ctx| {
                let check_path = check_path.clone();
                Box::pin(async move {
                    let out = ctx
                        .run(Command::builder("cat").arg(&check_path).build())
                        .await?;
                    voltest_core::assert::contains(&out, "started")?;
                    voltest_core::assert::does_not_contain(&out, "stopped")
                })
            }))
            .unwrap();

        let report = suite.run(&executor(), 1, None).await.unwrap();

        assert_eq!(report.passed(), 1, "{:?}", report.scenarios);
        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "started\nstopped\n");
    });
}

#[test]
fn test_fixture_acquire_failure_releases_earlier_fixtures() {
    futures::executor::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("fixture.log");
        let log_path = log.to_string_lossy().to_string();

        let mut suite = SuiteRegistry::new();
        suite.add_fixture(
            ResourceSpec::new(
                ResourceKind::NetworkEndpoint,
                "nfs-server",
                Command::shell(format!("echo stopped >> {log_path}")),
            )
            .create_with(Command::shell(format!("echo started >> {log_path}"))),
        );
        suite.add_fixture(
            ResourceSpec::new(
                ResourceKind::Container,
                "broken-fixture",
                Command::new("true"),
            )
            .create_with(Command::new("false")),
        );
        suite.register(passing("never runs")).unwrap();

        let err = suite.run(&executor(), 1, None).await.unwrap_err();
        assert!(err.to_string().contains("broken-fixture"));

        // The fixture that did come up was torn down, not stranded.
        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "started\nstopped\n");
    });
}

#[test]
fn test_fixture_leak_yields_harness_error_exit() {
    futures::executor::block_on(async {
        let mut suite = SuiteRegistry::new();
        suite.add_fixture(ResourceSpec::new(
            ResourceKind::NetworkEndpoint,
            "stuck-server",
            Command::new("false"),
        ));
        suite.register(passing("fine on its own")).unwrap();

        let report = suite.run(&executor(), 1, None).await.unwrap();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.fixture_leaks, vec!["stuck-server".to_string()]);
        assert_eq!(report.exit_code(), 2);
    });
}
