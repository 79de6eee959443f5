//! Delimited source file reading and header validation

use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use super::error::LoadError;

/// Columns the source file must provide
pub const REQUIRED_COLUMNS: [&str; 3] = ["customer_name", "address", "birth_date"];

/// Raw contents of a delimited file
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Normalized header names
    pub headers: Vec<String>,
    /// Data rows in file order
    pub rows: Vec<SourceRow>,
}

/// One data row as read from the file
#[derive(Debug, Clone)]
pub struct SourceRow {
    /// 1-based line number of the row
    pub line: u64,
    fields: Vec<String>,
}

impl SourceRow {
    /// Field at `index`, `None` when the row is shorter than the header
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// Positions of the required columns within the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub customer_name: usize,
    pub address: usize,
    pub birth_date: usize,
}

/// Read a delimited file with a header row
///
/// Header names are normalized. Blank lines are skipped, a row with more
/// fields than the header is an error, shorter rows are kept as-is.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<SourceTable, LoadError> {
    let read_error = |line: Option<u64>, reason: String| LoadError::SourceRead {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let file = File::open(path).map_err(|e| read_error(None, e.to_string()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let raw_headers = reader
        .headers()
        .map_err(|e| read_error(line_of(&e), e.to_string()))?
        .clone();
    if raw_headers.is_empty() {
        return Err(read_error(None, "file has no header row".to_string()));
    }
    let headers = normalize_headers(raw_headers.iter());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| read_error(line_of(&e), e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() > headers.len() {
            return Err(read_error(
                Some(line),
                format!("expected {} fields, found {}", headers.len(), record.len()),
            ));
        }
        rows.push(SourceRow {
            line,
            fields: record.iter().map(String::from).collect(),
        });
    }

    debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "Read source file"
    );
    Ok(SourceTable { headers, rows })
}

fn line_of(err: &csv::Error) -> Option<u64> {
    err.position().map(|p| p.line())
}

/// Trim and lowercase header names, dropping a leading byte-order mark
pub fn normalize_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_lowercase()
        })
        .collect()
}

/// Locate the required columns; the first occurrence of a duplicate wins
pub fn resolve_columns(headers: &[String]) -> Result<ColumnLayout, LoadError> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let positions: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|c| find(c)).collect();

    match positions.as_slice() {
        [Some(customer_name), Some(address), Some(birth_date)] => Ok(ColumnLayout {
            customer_name: *customer_name,
            address: *address,
            birth_date: *birth_date,
        }),
        _ => Err(LoadError::SchemaMismatch {
            missing: REQUIRED_COLUMNS
                .iter()
                .zip(&positions)
                .filter(|(_, pos)| pos.is_none())
                .map(|(name, _)| name.to_string())
                .collect(),
            found: headers.to_vec(),
        }),
    }
}
