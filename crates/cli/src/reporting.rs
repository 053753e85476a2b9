//! Human-readable suite report printing

use comfy_table::{Cell, Table, presets::UTF8_FULL};
use voltest_core::SuiteReport;

/// Print the report table followed by per-failure diagnostics
pub fn print(report: &SuiteReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Scenario", "Outcome", "Duration", "Resources"]);

    for scenario in &report.scenarios {
        let resources = if scenario.leaked.is_empty() {
            format!("{}", scenario.resources.len())
        } else {
            format!(
                "{} ({} leaked)",
                scenario.resources.len(),
                scenario.leaked.len()
            )
        };
        table.add_row(vec![
            Cell::new(&scenario.name),
            Cell::new(scenario.outcome.label()),
            Cell::new(format!("{:.1}s", scenario.duration_ms as f64 / 1000.0)),
            Cell::new(resources),
        ]);
    }
    println!("{table}");

    println!(
        "{} passed, {} failed, {} errored",
        report.passed(),
        report.failed(),
        report.errored()
    );

    for scenario in &report.scenarios {
        let Some(reason) = scenario.outcome.reason() else {
            continue;
        };
        println!("\n--- {} [{}]", scenario.name, scenario.outcome.label());
        println!("{reason}");
        if let Some(output) = &scenario.failure_output {
            println!("captured output:\n{output}");
        }
        if !scenario.leaked.is_empty() {
            println!("leaked resources (manual cleanup required):");
            for identity in &scenario.leaked {
                println!("  {identity}");
            }
        }
    }

    let leaked = report.leaked_resources();
    if !leaked.is_empty() {
        println!("\n{} resource(s) leaked in total:", leaked.len());
        for identity in leaked {
            println!("  {identity}");
        }
    }

    if report.all_passed() {
        println!("all scenarios passed");
    }
}
