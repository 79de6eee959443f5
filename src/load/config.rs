//! Configuration types for the loader

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::LoadError;
use super::schema::TableName;

/// Upper bound on the number of records loaded per run
pub const MAX_RECORDS: usize = 50;

/// Default number of rows per insert statement
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Largest accepted batch size
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default field delimiter
pub const DEFAULT_DELIMITER: char = ';';

/// Default destination table
pub const DEFAULT_TABLE: &str = "unique_values";

/// Default connection identifier
pub const DEFAULT_CONNECTION_ID: &str = "destination";

/// Configuration for a load run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Path of the delimited source file
    pub source_path: PathBuf,
    /// Destination table, optionally schema-qualified
    pub table: String,
    /// Single-byte field delimiter
    pub delimiter: char,
    /// Rows per insert statement and transaction
    pub batch_size: usize,
    /// Connection registry identifier
    pub connection_id: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/customers.csv"),
            table: DEFAULT_TABLE.to_string(),
            delimiter: DEFAULT_DELIMITER,
            batch_size: DEFAULT_BATCH_SIZE,
            connection_id: DEFAULT_CONNECTION_ID.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Create a new builder for LoaderConfig
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, LoadError> {
        let config: LoaderConfig =
            toml::from_str(text).map_err(|e| LoadError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoadError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check field ranges and the table name
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(LoadError::InvalidConfig(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        self.delimiter_byte()?;
        self.table_name()?;
        if self.connection_id.trim().is_empty() {
            return Err(LoadError::InvalidConfig(
                "connection_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Delimiter as the byte handed to the CSV reader
    pub fn delimiter_byte(&self) -> Result<u8, LoadError> {
        match self.delimiter {
            '"' | '\n' | '\r' => Err(LoadError::InvalidConfig(format!(
                "delimiter {:?} is not allowed",
                self.delimiter
            ))),
            c if c.is_ascii() => Ok(c as u8),
            c => Err(LoadError::InvalidConfig(format!(
                "delimiter must be a single ASCII character, got {c:?}"
            ))),
        }
    }

    /// Parsed destination table name
    pub fn table_name(&self) -> Result<TableName, LoadError> {
        TableName::parse(&self.table)
    }
}

/// Builder for LoaderConfig
#[derive(Debug, Default)]
pub struct LoaderConfigBuilder {
    source_path: Option<PathBuf>,
    table: Option<String>,
    delimiter: Option<char>,
    batch_size: Option<usize>,
    connection_id: Option<String>,
}

impl LoaderConfigBuilder {
    /// Set the source file path
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Set the destination table
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Set the field delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set the number of rows per batch
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the connection identifier
    pub fn connection_id(mut self, id: &str) -> Self {
        self.connection_id = Some(id.to_string());
        self
    }

    /// Build and validate the LoaderConfig
    pub fn build(self) -> Result<LoaderConfig, LoadError> {
        let source_path = self
            .source_path
            .ok_or_else(|| LoadError::InvalidConfig("source path is required".to_string()))?;

        let config = LoaderConfig {
            source_path,
            table: self.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            delimiter: self.delimiter.unwrap_or(DEFAULT_DELIMITER),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            connection_id: self
                .connection_id
                .unwrap_or_else(|| DEFAULT_CONNECTION_ID.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}
