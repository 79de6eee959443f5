//! Turning raw source rows into insertable rows

use chrono::NaiveDate;
use serde::Serialize;

use super::config::MAX_RECORDS;
use super::dates::parse_date;
use super::source::{ColumnLayout, SourceRow, SourceTable};

/// Tokens read as a missing value
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN",
];

/// Whether a raw field counts as missing
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    MISSING_TOKENS.contains(&trimmed)
}

/// Projected source row with its date parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub customer_name: String,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedRow {
    pub customer_name: String,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub run_id: String,
}

impl PreparedRow {
    /// Attach a run identifier to a record
    pub fn from_record(record: SourceRecord, run_id: &str) -> Self {
        Self {
            customer_name: record.customer_name,
            address: record.address,
            birth_date: record.birth_date,
            run_id: run_id.to_string(),
        }
    }
}

/// Result of preparing a source table
#[derive(Debug, Clone, Default)]
pub struct PreparedRecords {
    /// Rows to insert, at most [`MAX_RECORDS`]
    pub rows: Vec<PreparedRow>,
    /// Data rows in the file
    pub rows_read: usize,
    /// Rows dropped for an empty customer name
    pub rows_dropped: usize,
    /// Valid rows beyond the cap
    pub rows_over_cap: usize,
    /// Kept rows whose birth date was present but unparseable
    pub unparsed_dates: usize,
}

/// Project one row onto the required columns
///
/// Returns `None` when the trimmed customer name is empty. The address keeps
/// its original spacing.
pub fn project_row(row: &SourceRow, layout: &ColumnLayout) -> Option<(SourceRecord, bool)> {
    let customer_name = row.get(layout.customer_name).unwrap_or_default().trim();
    if customer_name.is_empty() {
        return None;
    }

    let address = row
        .get(layout.address)
        .filter(|a| !is_missing(a))
        .map(String::from);
    let raw_date = row.get(layout.birth_date).filter(|d| !is_missing(d));
    let birth_date = raw_date.and_then(parse_date);
    let unparsed = raw_date.is_some() && birth_date.is_none();

    Some((
        SourceRecord {
            customer_name: customer_name.to_string(),
            address,
            birth_date,
        },
        unparsed,
    ))
}

/// Clean, cap and tag the rows of a source table
pub fn prepare_records(table: &SourceTable, layout: &ColumnLayout, run_id: &str) -> PreparedRecords {
    let mut prepared = PreparedRecords {
        rows_read: table.rows.len(),
        ..Default::default()
    };

    for row in &table.rows {
        let Some((record, unparsed)) = project_row(row, layout) else {
            prepared.rows_dropped += 1;
            continue;
        };

        if prepared.rows.len() == MAX_RECORDS {
            prepared.rows_over_cap += 1;
            continue;
        }
        if unparsed {
            prepared.unparsed_dates += 1;
        }
        prepared.rows.push(PreparedRow::from_record(record, run_id));
    }

    prepared
}
