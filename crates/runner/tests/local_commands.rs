//! Tests for local command execution and output capture

use std::time::Duration;

use voltest_runner::{Command, Error, Runner};

#[test]
fn test_run_captures_stdout() {
    futures::executor::block_on(async {
        let runner = Runner::new();
        let cmd = Command::builder("echo").arg("lost+found").build();

        let result = runner.run(&cmd).await.unwrap();

        assert!(result.succeeded());
        assert_eq!(result.exit_code(), Some(0));
        assert_eq!(result.output(), "lost+found\n");
    });
}

#[test]
fn test_run_captures_stderr_merged() {
    futures::executor::block_on(async {
        let runner = Runner::new();
        let cmd = Command::shell("echo out; echo err >&2");

        let result = runner.run(&cmd).await.unwrap();

        assert!(result.output().contains("out"));
        assert!(result.output().contains("err"));
    });
}

#[test]
fn test_run_fails_on_nonzero_exit() {
    futures::executor::block_on(async {
        let runner = Runner::new();
        let cmd = Command::shell("echo denied >&2; exit 13");

        let err = runner.run(&cmd).await.unwrap_err();

        match err {
            Error::CommandFailed {
                exit_code,
                output,
                timed_out,
                ..
            } => {
                assert_eq!(exit_code, Some(13));
                assert!(output.contains("denied"));
                assert!(!timed_out);
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    });
}

#[test]
fn test_run_unchecked_returns_nonzero_result() {
    futures::executor::block_on(async {
        let runner = Runner::new();
        let cmd = Command::shell("exit 3");

        let result = runner.run_unchecked(&cmd).await.unwrap();

        assert!(!result.succeeded());
        assert_eq!(result.exit_code(), Some(3));
    });
}

#[test]
fn test_spawn_failure() {
    futures::executor::block_on(async {
        let runner = Runner::new();
        let cmd = Command::new("this_command_does_not_exist_12345");

        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, Error::SpawnFailed { .. }));
    });
}

#[test]
fn test_timeout_kills_command() {
    futures::executor::block_on(async {
        let runner = Runner::with_timeout(Duration::from_secs(1));
        let cmd = Command::builder("sleep").arg("5").build();

        let err = runner.run(&cmd).await.unwrap_err();

        assert!(err.is_timeout());
        match err {
            Error::CommandFailed { timed_out, .. } => assert!(timed_out),
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    });
}

#[test]
fn test_timeout_preserves_partial_output() {
    futures::executor::block_on(async {
        let runner = Runner::with_timeout(Duration::from_secs(1));
        let cmd = Command::shell("echo early; sleep 5");

        let err = runner.run(&cmd).await.unwrap_err();
        assert_eq!(err.captured_output(), Some("early\n"));
    });
}

#[test]
fn test_shell_pipeline() {
    futures::executor::block_on(async {
        let runner = Runner::new();
        let cmd = Command::shell("printf 'a\\nb\\nc\\n' | wc -l");

        let result = runner.run(&cmd).await.unwrap();
        assert_eq!(result.output().trim(), "3");
    });
}
