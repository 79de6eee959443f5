//! Schema ensuring and CSV loading
//!
//! The [`SchemaEnsurer`] creates the destination table when it is absent.
//! The [`Loader`] reads a delimited file, checks its header, cleans and caps
//! the rows, and inserts them in committed batches:
//!
//! ```rust,ignore
//! use csv_loader::{ConnectionDescriptor, LoaderConfig, Loader};
//!
//! let config = LoaderConfig::builder()
//!     .source_path("/data/customers.csv")
//!     .table("dbo.unique_values")
//!     .build()?;
//! let descriptor = ConnectionDescriptor::duckdb("local", "warehouse.duckdb");
//!
//! let report = Loader::new(config, descriptor)?.load("manual-2024-06-01")?;
//! println!("Inserted {} rows in {}", report.rows_inserted, report.duration_string());
//! ```

mod config;
mod dates;
mod db;
mod ensure;
mod error;
mod loader;
mod prepare;
mod schema;
mod source;

pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONNECTION_ID, DEFAULT_DELIMITER, DEFAULT_TABLE, LoaderConfig,
    LoaderConfigBuilder, MAX_BATCH_SIZE, MAX_RECORDS,
};
pub use dates::parse_date;
#[cfg(feature = "duckdb-backend")]
pub use db::DuckDbSession;
#[cfg(feature = "postgres-backend")]
pub use db::PostgresSession;
pub use db::{Connector, DefaultConnector, ScopedConnection, Session};
pub use ensure::{EnsureOutcome, SchemaEnsurer};
pub use error::LoadError;
pub use loader::{LoadOutcome, LoadReport, Loader, validate_run_id};
pub use prepare::{
    MISSING_TOKENS, PreparedRecords, PreparedRow, SourceRecord, is_missing, prepare_records,
    project_row,
};
pub use schema::{
    ADDRESS_MAX_LEN, CUSTOMER_NAME_MAX_LEN, DestinationSchema, Dialect, INSERT_COLUMNS,
    RUN_ID_MAX_LEN, TableName,
};
pub use source::{
    ColumnLayout, REQUIRED_COLUMNS, SourceRow, SourceTable, normalize_headers, read_delimited,
    resolve_columns,
};
