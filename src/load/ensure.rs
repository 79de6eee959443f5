//! Destination table creation

use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::LoaderConfig;
use super::db::{Connector, DefaultConnector, ScopedConnection};
use super::error::LoadError;
use super::schema::TableName;
use crate::connection::ConnectionDescriptor;

/// What the ensurer found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    /// The table was absent and has been created
    Created,
    /// The table was already present and was left untouched
    AlreadyExists,
}

/// Makes sure the destination table exists
pub struct SchemaEnsurer<C: Connector = DefaultConnector> {
    table: TableName,
    descriptor: ConnectionDescriptor,
    connector: C,
}

impl SchemaEnsurer<DefaultConnector> {
    /// Create an ensurer using the backend named by the descriptor
    pub fn new(table: TableName, descriptor: ConnectionDescriptor) -> Self {
        Self::with_connector(table, descriptor, DefaultConnector)
    }

    /// Create an ensurer for the table in a loader configuration
    pub fn from_config(
        config: &LoaderConfig,
        descriptor: ConnectionDescriptor,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(config.table_name()?, descriptor))
    }
}

impl<C: Connector> SchemaEnsurer<C> {
    /// Create an ensurer with a custom connector
    pub fn with_connector(table: TableName, descriptor: ConnectionDescriptor, connector: C) -> Self {
        Self {
            table,
            descriptor,
            connector,
        }
    }

    /// Destination table
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the table unless it already exists
    pub fn ensure(&self) -> Result<EnsureOutcome, LoadError> {
        let mut conn = ScopedConnection::open(&self.connector, &self.descriptor)?;

        info!(table = %self.table, destination = conn.target(), "Checking destination table");
        if conn.table_exists(&self.table)? {
            info!(table = %self.table, "Table already exists");
            return Ok(EnsureOutcome::AlreadyExists);
        }

        conn.create_table(&self.table)?;
        info!(table = %self.table, "Created table");
        Ok(EnsureOutcome::Created)
    }
}
