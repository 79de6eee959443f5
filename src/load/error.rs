//! Error types for schema and load operations

use std::path::PathBuf;
use thiserror::Error;

use crate::connection::RegistryError;

/// Errors that can occur while ensuring the destination table or loading rows
#[derive(Error, Debug)]
pub enum LoadError {
    /// Destination could not be reached or refused the login
    #[error("Connection error ({target}): {message}")]
    Connection { target: String, message: String },

    /// Source file missing, unreadable or malformed
    #[error("Cannot read {}{}: {reason}", .path.display(), line_suffix(.line))]
    SourceRead {
        path: PathBuf,
        line: Option<u64>,
        reason: String,
    },

    /// Required columns absent from the source header
    #[error("CSV missing columns: {missing:?}. Found: {found:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// Batch insert failed; earlier batches remain committed
    #[error("Insert failed on batch {batch} (rows {first_row}-{last_row}): {message}")]
    Insert {
        batch: usize,
        first_row: usize,
        last_row: usize,
        committed: usize,
        message: String,
    },

    /// DDL against the destination failed
    #[error("Schema error on {table}: {message}")]
    Schema { table: String, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Table name is not a plain (optionally schema-qualified) identifier
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl LoadError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Connection { target, message } => {
                format!(
                    "Cannot connect to {target}: {message}\n\n\
                    Hint: Check the connection registry entry and that the database is reachable."
                )
            }
            LoadError::SourceRead { .. } => {
                format!(
                    "{self}\n\nHint: Check that the file exists and uses the configured delimiter."
                )
            }
            LoadError::SchemaMismatch { .. } => {
                format!(
                    "{self}\n\nHint: The header must contain customer_name, address and birth_date."
                )
            }
            LoadError::Insert {
                batch, committed, ..
            } => {
                format!(
                    "{self}\n\nHint: {committed} rows from batches before {batch} were committed \
                    and remain in the table."
                )
            }
            LoadError::Schema { table, message } => {
                format!(
                    "Cannot create {table}: {message}\n\n\
                    Hint: Check that the login may create tables in the target schema."
                )
            }
            LoadError::InvalidConfig(msg) => {
                format!("Invalid configuration: {msg}\n\nHint: Check your loader configuration.")
            }
            LoadError::InvalidTableName(name) => {
                format!(
                    "Invalid table name: {name}\n\n\
                    Hint: Use letters, digits and underscores, optionally as schema.table."
                )
            }
            _ => self.to_string(),
        }
    }

    /// Whether the error happened before any connection was opened
    pub fn is_pre_connection(&self) -> bool {
        matches!(
            self,
            LoadError::SourceRead { .. }
                | LoadError::SchemaMismatch { .. }
                | LoadError::InvalidConfig(_)
                | LoadError::InvalidTableName(_)
        )
    }
}

impl From<RegistryError> for LoadError {
    fn from(err: RegistryError) -> Self {
        LoadError::InvalidConfig(err.to_string())
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for LoadError {
    fn from(err: duckdb::Error) -> Self {
        LoadError::Query(err.to_string())
    }
}

#[cfg(feature = "postgres-backend")]
impl From<tokio_postgres::Error> for LoadError {
    fn from(err: tokio_postgres::Error) -> Self {
        LoadError::Query(err.to_string())
    }
}
