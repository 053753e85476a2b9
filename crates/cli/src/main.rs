//! voltest - integration-test driver for Docker volume plugins
//!
//! Runs black-box scenarios against a host with the volume plugin, Docker,
//! and (depending on the suite) a Ceph cluster or NFS tooling installed.
//! Correctness is asserted from command output, mount tables and device
//! listings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use voltest_core::prelude::*;
use voltest_core::RunNamer;

mod reporting;
mod suites;

#[derive(Parser)]
#[command(name = "voltest")]
#[command(about = "Integration-test driver for Docker volume plugins (RBD/NFS)")]
#[command(version)]
struct Cli {
    /// Suite to run
    #[arg(value_enum, default_value_t = Suite::All)]
    suite: Suite,

    /// Only run scenarios whose name contains this substring
    #[arg(short, long)]
    filter: Option<String>,

    /// Maximum number of scenarios executing concurrently
    #[arg(short, long, default_value_t = 1)]
    parallel: usize,

    /// Per-command timeout in seconds
    #[arg(short, long, default_value_t = 300)]
    timeout: u64,

    /// Run identifier used to namespace resource names (random by default)
    #[arg(long)]
    run_id: Option<String>,

    /// Emit the suite report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Suite {
    /// Basic docker run and routed-network scenarios
    Docker,
    /// Ceph/RBD-backed volume scenarios
    Ceph,
    /// NFS-backed volume scenarios
    Nfs,
    /// Everything
    All,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(resolve_exit_code(run(cli)));
}

/// Map the run's outcome to a process exit code
///
/// Errors reaching here are harness-level aborts (registration bugs, fixture
/// acquisition failures), never scenario failures: they exit 2, reserving 1
/// for a report with Failed scenarios.
fn resolve_exit_code(outcome: Result<i32>) -> i32 {
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("voltest: {err:#}");
            2
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel)?;

    let namer = match &cli.run_id {
        Some(run_id) => RunNamer::new(run_id),
        None => RunNamer::generate(),
    };
    info!(run_id = namer.run_id(), "starting voltest run");

    let runner = Runner::with_timeout(Duration::from_secs(cli.timeout));
    let executor = Executor::new(runner, Arc::new(namer), cancel);

    let mut suite = SuiteRegistry::new();
    match cli.suite {
        Suite::Docker => suites::docker::register(&mut suite)?,
        Suite::Ceph => suites::ceph::register(&mut suite)?,
        Suite::Nfs => suites::nfs::register(&mut suite)?,
        Suite::All => {
            suites::docker::register(&mut suite)?;
            suites::ceph::register(&mut suite)?;
            suites::nfs::register(&mut suite)?;
        }
    }

    let report = smol::block_on(suite.run(&executor, cli.parallel, cli.filter.as_deref()))
        .context("suite aborted before completion")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        reporting::print(&report);
    }

    Ok(report.exit_code())
}

/// Wire SIGINT/SIGTERM to the cancel token
///
/// Running scenarios observe the flag at their next action boundary and
/// abort; their teardown still runs, so a Ctrl-C does not strand containers
/// or mapped devices. A second signal terminates the process the default way.
fn install_interrupt_handler(cancel: &CancelToken) -> Result<()> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register_conditional_default(signal, Arc::clone(&flag))?;
        signal_hook::flag::register(signal, Arc::clone(&flag))?;
    }

    let cancel = cancel.clone();
    std::thread::spawn(move || {
        loop {
            if flag.load(Ordering::Relaxed) {
                warn!("interrupt received, finishing teardown before exit");
                cancel.cancel();
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_harness_errors_exit_two() {
        assert_eq!(resolve_exit_code(Err(anyhow!("fixture acquire failed"))), 2);
        assert_eq!(resolve_exit_code(Ok(0)), 0);
        assert_eq!(resolve_exit_code(Ok(1)), 1);
    }
}
