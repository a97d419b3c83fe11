use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::models::{AggregateReport, Aggregation};

/// Print the aggregated dependencies as a table, followed by a summary line.
pub fn render(aggregation: &Aggregation, show_conflicts: bool, quiet: bool) {
    let report = &aggregation.report;

    if !quiet {
        println!(
            "\n {} v{}\n",
            "dep-inventory".bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!("{}", dependency_table(report));

        let conflicts = report.conflicts();
        if show_conflicts && !conflicts.is_empty() {
            println!("\n {} Declared with different versions:\n", "[WARN]".yellow().bold());
            println!("{}", conflict_table(report));
        }
        println!();
    }

    println!(
        "Dependencies: {}  Conflicts: {}  Skipped applications: {}",
        report.len().to_string().green(),
        report.conflicts().len().to_string().yellow(),
        aggregation.skipped.len().to_string().red(),
    );
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| Cell::new(l).add_attribute(Attribute::Bold))
        .collect()
}

fn dependency_table(report: &AggregateReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Name", "Version", "Description"]));

    for entry in report.entries() {
        table.add_row(vec![
            Cell::new(entry.name),
            Cell::new(entry.version),
            match entry.description {
                Some(d) => Cell::new(d),
                None => Cell::new("").fg(Color::DarkGrey),
            },
        ]);
    }
    table
}

fn conflict_table(report: &AggregateReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Name", "Reported", "Declared by"]));

    for conflict in report.conflicts() {
        let declared: Vec<String> = conflict
            .declarations
            .iter()
            .map(|d| format!("{} ({})", d.application.display(), d.spec))
            .collect();
        table.add_row(vec![
            Cell::new(conflict.identifier),
            Cell::new(conflict.reported_version).fg(Color::Yellow),
            Cell::new(declared.join("\n")),
        ]);
    }
    table
}
