//! Output formatting for CLI

use anyhow::Result;
use csv_loader::{EnsureOutcome, LoadOutcome, LoadReport, TableName};
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format the result of a table check
pub fn format_ensure_outcome(table: &TableName, outcome: EnsureOutcome) -> String {
    match outcome {
        EnsureOutcome::Created => format!("Created table {table}"),
        EnsureOutcome::AlreadyExists => format!("Table {table} already exists"),
    }
}

/// Format load statistics
pub fn format_load_report(report: &LoadReport) -> String {
    let mut output = String::new();

    match report.outcome {
        LoadOutcome::Empty => output.push_str("No records to insert.\n"),
        LoadOutcome::Loaded => output.push_str(&format!(
            "Inserted {} rows into {} in {} batch(es)\n",
            report.rows_inserted, report.table, report.batches_committed
        )),
    }

    output.push_str(&format!("  Run ID: {}\n", report.run_id));
    output.push_str(&format!("  Source: {}\n", report.source_path.display()));
    output.push_str(&format!("  Rows read: {}\n", report.rows_read));
    if report.rows_dropped > 0 {
        output.push_str(&format!("  Dropped (empty name): {}\n", report.rows_dropped));
    }
    if report.rows_over_cap > 0 {
        output.push_str(&format!("  Left out by cap: {}\n", report.rows_over_cap));
    }
    if report.unparsed_dates > 0 {
        output.push_str(&format!(
            "  Unparseable birth dates (stored as NULL): {}\n",
            report.unparsed_dates
        ));
    }
    output.push_str(&format!("  Duration: {}", report.duration_string()));

    output
}
