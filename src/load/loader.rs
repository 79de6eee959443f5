//! Loading a delimited file into the destination table

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{LoaderConfig, MAX_RECORDS};
use super::db::{Connector, DefaultConnector, ScopedConnection};
use super::error::LoadError;
use super::prepare::{PreparedRecords, prepare_records};
use super::schema::{RUN_ID_MAX_LEN, TableName};
use super::source::{read_delimited, resolve_columns};
use crate::connection::ConnectionDescriptor;

/// How a load run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOutcome {
    /// Rows were inserted
    Loaded,
    /// Nothing survived cleaning; no connection was opened
    Empty,
}

/// Statistics from a load run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Run identifier stamped on every row
    pub run_id: String,
    /// Destination table
    pub table: String,
    /// Source file
    pub source_path: PathBuf,
    /// Outcome
    pub outcome: LoadOutcome,
    /// Data rows in the source file
    pub rows_read: usize,
    /// Rows dropped for an empty customer name
    pub rows_dropped: usize,
    /// Valid rows left out by the record cap
    pub rows_over_cap: usize,
    /// Rows whose birth date could not be parsed
    pub unparsed_dates: usize,
    /// Rows selected for insertion
    pub rows_prepared: usize,
    /// Rows inserted
    pub rows_inserted: usize,
    /// Batches committed
    pub batches_committed: usize,
    /// Duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl LoadReport {
    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let millis = self.duration.as_millis();
        if millis < 1000 {
            format!("{millis}ms")
        } else {
            format!("{:.1}s", self.duration.as_secs_f64())
        }
    }
}

/// Check a run identifier before it is stamped on rows
pub fn validate_run_id(run_id: &str) -> Result<(), LoadError> {
    if run_id.trim().is_empty() {
        return Err(LoadError::InvalidConfig(
            "run identifier must not be empty".to_string(),
        ));
    }
    let len = run_id.chars().count();
    if len > RUN_ID_MAX_LEN {
        return Err(LoadError::InvalidConfig(format!(
            "run identifier is {len} characters, at most {RUN_ID_MAX_LEN} allowed"
        )));
    }
    Ok(())
}

/// Loads a validated, capped subset of the source file
pub struct Loader<C: Connector = DefaultConnector> {
    config: LoaderConfig,
    table: TableName,
    descriptor: ConnectionDescriptor,
    connector: C,
}

impl Loader<DefaultConnector> {
    /// Create a loader using the backend named by the descriptor
    pub fn new(config: LoaderConfig, descriptor: ConnectionDescriptor) -> Result<Self, LoadError> {
        Self::with_connector(config, descriptor, DefaultConnector)
    }
}

impl<C: Connector> Loader<C> {
    /// Create a loader with a custom connector
    pub fn with_connector(
        config: LoaderConfig,
        descriptor: ConnectionDescriptor,
        connector: C,
    ) -> Result<Self, LoadError> {
        config.validate()?;
        let table = config.table_name()?;
        Ok(Self {
            config,
            table,
            descriptor,
            connector,
        })
    }

    /// Destination table
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Read, validate and clean the source file without touching the destination
    pub fn prepare(&self, run_id: &str) -> Result<PreparedRecords, LoadError> {
        let path = &self.config.source_path;
        info!(source = %path.display(), "Loading data from CSV");

        let table = read_delimited(path, self.config.delimiter_byte()?)?;
        info!(columns = ?table.headers, "Checking required columns");
        let layout = resolve_columns(&table.headers)?;
        debug!(?layout, "Required columns present");

        let prepared = prepare_records(&table, &layout, run_id);
        if prepared.unparsed_dates > 0 {
            warn!(
                count = prepared.unparsed_dates,
                "Unparseable birth dates will be stored as NULL"
            );
        }
        info!(
            "Prepared {} records (first {}).",
            prepared.rows.len(),
            MAX_RECORDS
        );
        Ok(prepared)
    }

    /// Load the source file, tagging every row with `run_id`
    pub fn load(&self, run_id: &str) -> Result<LoadReport, LoadError> {
        let start = Instant::now();
        validate_run_id(run_id)?;
        let prepared = self.prepare(run_id)?;

        let mut report = LoadReport {
            run_id: run_id.to_string(),
            table: self.table.qualified(),
            source_path: self.config.source_path.clone(),
            outcome: LoadOutcome::Empty,
            rows_read: prepared.rows_read,
            rows_dropped: prepared.rows_dropped,
            rows_over_cap: prepared.rows_over_cap,
            unparsed_dates: prepared.unparsed_dates,
            rows_prepared: prepared.rows.len(),
            rows_inserted: 0,
            batches_committed: 0,
            duration: Duration::ZERO,
        };

        if prepared.rows.is_empty() {
            info!("No records to insert.");
            report.duration = start.elapsed();
            return Ok(report);
        }

        let total = prepared.rows.len();
        let batch_size = self.config.batch_size;
        let mut conn = ScopedConnection::open(&self.connector, &self.descriptor)?;

        for (index, chunk) in prepared.rows.chunks(batch_size).enumerate() {
            let first_row = index * batch_size + 1;
            conn.insert_batch(&self.table, chunk)
                .map_err(|e| LoadError::Insert {
                    batch: index + 1,
                    first_row,
                    last_row: first_row + chunk.len() - 1,
                    committed: report.rows_inserted,
                    message: e.to_string(),
                })?;
            report.rows_inserted += chunk.len();
            report.batches_committed += 1;
            info!("Inserted {}/{}", report.rows_inserted, total);
        }

        report.outcome = LoadOutcome::Loaded;
        report.duration = start.elapsed();
        info!(
            "Done. Inserted {} rows into {}.",
            report.rows_inserted, self.table
        );
        Ok(report)
    }
}
