//! Destination database sessions
//!
//! A [`Connector`] turns a [`ConnectionDescriptor`] into a boxed [`Session`].
//! DuckDB (embedded) and PostgreSQL backends are available behind the
//! `duckdb-backend` and `postgres-backend` features.

use std::ops::{Deref, DerefMut};

use tracing::debug;

use super::error::LoadError;
use super::prepare::PreparedRow;
use super::schema::{Dialect, TableName};
use crate::connection::{BackendKind, ConnectionDescriptor};

/// An open connection to the destination
pub trait Session {
    /// SQL dialect spoken by this session
    fn dialect(&self) -> Dialect;

    /// Whether the table exists
    fn table_exists(&mut self, table: &TableName) -> Result<bool, LoadError>;

    /// Create the table and its supporting objects if absent
    fn create_table(&mut self, table: &TableName) -> Result<(), LoadError>;

    /// Insert rows with one statement in one committed transaction
    fn insert_batch(&mut self, table: &TableName, rows: &[PreparedRow]) -> Result<usize, LoadError>;
}

/// Opens sessions for connection descriptors
pub trait Connector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>, LoadError>;
}

impl<C: Connector + ?Sized> Connector for &C {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>, LoadError> {
        (**self).connect(descriptor)
    }
}

/// Connector dispatching on the descriptor's backend
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

impl Connector for DefaultConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>, LoadError> {
        match descriptor.backend {
            BackendKind::DuckDb => {
                #[cfg(feature = "duckdb-backend")]
                {
                    Ok(Box::new(DuckDbSession::connect(descriptor)?))
                }
                #[cfg(not(feature = "duckdb-backend"))]
                {
                    Err(backend_disabled(descriptor, "duckdb-backend"))
                }
            }
            BackendKind::Postgres => {
                #[cfg(feature = "postgres-backend")]
                {
                    Ok(Box::new(PostgresSession::connect(descriptor)?))
                }
                #[cfg(not(feature = "postgres-backend"))]
                {
                    Err(backend_disabled(descriptor, "postgres-backend"))
                }
            }
        }
    }
}

#[allow(dead_code)]
fn backend_disabled(descriptor: &ConnectionDescriptor, feature: &str) -> LoadError {
    LoadError::Connection {
        target: descriptor.target(),
        message: format!(
            "{} support not enabled. Build with --features {feature}",
            descriptor.backend
        ),
    }
}

/// Session held for the duration of one operation
///
/// Released when dropped, on every exit path.
pub struct ScopedConnection {
    session: Box<dyn Session>,
    target: String,
    connection_string: Option<String>,
}

impl ScopedConnection {
    /// Open a session through the connector
    pub fn open<C: Connector + ?Sized>(
        connector: &C,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Self, LoadError> {
        let target = descriptor.target();
        // Driver strings only describe server backends
        let connection_string = match descriptor.backend {
            BackendKind::DuckDb => None,
            BackendKind::Postgres => Some(descriptor.redacted_connection_string()),
        };
        debug!(
            destination = %target,
            connection = connection_string.as_deref().unwrap_or("-"),
            "Opening connection"
        );
        let session = connector.connect(descriptor)?;
        Ok(Self {
            session,
            target,
            connection_string,
        })
    }

    /// Credential-free description of the destination
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Driver connection string with the password masked, for server backends
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }
}

impl Deref for ScopedConnection {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        debug!(destination = %self.target, "Releasing connection");
    }
}

// ============================================================================
// DuckDB Implementation
// ============================================================================

#[cfg(feature = "duckdb-backend")]
pub use duckdb_impl::DuckDbSession;

#[cfg(feature = "duckdb-backend")]
mod duckdb_impl {
    use super::{LoadError, PreparedRow, Session};
    use crate::connection::ConnectionDescriptor;
    use crate::load::schema::{DestinationSchema, Dialect, TableName};

    /// Session on an embedded DuckDB database
    pub struct DuckDbSession {
        conn: duckdb::Connection,
        path: Option<String>,
    }

    impl DuckDbSession {
        /// Open the database file named by the descriptor
        pub fn connect(descriptor: &ConnectionDescriptor) -> Result<Self, LoadError> {
            match descriptor.database.as_deref() {
                None | Some(":memory:") => Self::memory(),
                Some(path) => Self::open(path).map_err(|e| LoadError::Connection {
                    target: descriptor.target(),
                    message: e.to_string(),
                }),
            }
        }

        /// Open or create a database file
        pub fn open(path: &str) -> Result<Self, LoadError> {
            let conn = duckdb::Connection::open(path)?;
            Ok(Self {
                conn,
                path: Some(path.to_string()),
            })
        }

        /// Open an in-memory database
        pub fn memory() -> Result<Self, LoadError> {
            let conn = duckdb::Connection::open_in_memory()?;
            Ok(Self { conn, path: None })
        }

        /// Database path (if not in-memory)
        pub fn path(&self) -> Option<&str> {
            self.path.as_deref()
        }
    }

    impl Session for DuckDbSession {
        fn dialect(&self) -> Dialect {
            Dialect::DuckDb
        }

        fn table_exists(&mut self, table: &TableName) -> Result<bool, LoadError> {
            let count: i64 = self.conn.query_row(
                DestinationSchema::table_exists(Dialect::DuckDb),
                duckdb::params![table.schema().unwrap_or("main"), table.name()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        }

        fn create_table(&mut self, table: &TableName) -> Result<(), LoadError> {
            let ddl = DestinationSchema::create_table(Dialect::DuckDb, table);
            self.conn
                .execute_batch(&ddl)
                .map_err(|e| LoadError::Schema {
                    table: table.qualified(),
                    message: e.to_string(),
                })
        }

        fn insert_batch(
            &mut self,
            table: &TableName,
            rows: &[PreparedRow],
        ) -> Result<usize, LoadError> {
            if rows.is_empty() {
                return Ok(0);
            }
            let sql = DestinationSchema::insert_rows(Dialect::DuckDb, table, rows.len());
            let values: Vec<Option<String>> = rows
                .iter()
                .flat_map(|row| {
                    [
                        Some(row.customer_name.clone()),
                        row.address.clone(),
                        row.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                        Some(row.run_id.clone()),
                    ]
                })
                .collect();

            let tx = self.conn.transaction()?;
            let inserted = tx.execute(&sql, duckdb::params_from_iter(values.iter()))?;
            tx.commit()?;
            Ok(inserted)
        }
    }
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

#[cfg(feature = "postgres-backend")]
pub use postgres_impl::PostgresSession;

#[cfg(feature = "postgres-backend")]
mod postgres_impl {
    use std::time::Duration;

    use tokio::runtime::{Builder, Runtime};
    use tokio_postgres::types::ToSql;
    use tokio_postgres::{Client, Config, NoTls};

    use super::{LoadError, PreparedRow, Session};
    use crate::connection::ConnectionDescriptor;
    use crate::load::schema::{DestinationSchema, Dialect, TableName};

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Session on a PostgreSQL server
    ///
    /// The async client is driven by a current-thread runtime owned by the
    /// session, so every call blocks.
    pub struct PostgresSession {
        runtime: Runtime,
        client: Client,
    }

    impl PostgresSession {
        /// Connect using the descriptor's host, port, database and credentials
        pub fn connect(descriptor: &ConnectionDescriptor) -> Result<Self, LoadError> {
            let target = descriptor.target();
            let connection_error = |message: String| LoadError::Connection {
                target: target.clone(),
                message,
            };

            if descriptor.extras.encrypt {
                return Err(connection_error(
                    "encrypted transport requested but TLS is not available".to_string(),
                ));
            }

            let mut config = Config::new();
            config
                .host(descriptor.host.as_deref().unwrap_or("localhost"))
                .connect_timeout(CONNECT_TIMEOUT);
            if let Some(port) = descriptor.port {
                config.port(port);
            }
            if let Some(database) = descriptor.database.as_deref() {
                config.dbname(database);
            }
            if let Some(login) = descriptor.login.as_deref() {
                config.user(login);
            }
            if let Some(password) = descriptor.password.as_deref() {
                config.password(password);
            }

            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| connection_error(e.to_string()))?;
            let (client, connection) = runtime
                .block_on(config.connect(NoTls))
                .map_err(|e| connection_error(e.to_string()))?;

            // Polled whenever the runtime blocks on a client call
            runtime.spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "PostgreSQL connection error");
                }
            });

            Ok(Self { runtime, client })
        }
    }

    impl Session for PostgresSession {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        fn table_exists(&mut self, table: &TableName) -> Result<bool, LoadError> {
            let Self { runtime, client } = self;
            let schema = table.schema();
            let name = table.name();
            let row = runtime.block_on(async {
                client
                    .query_one(
                        DestinationSchema::table_exists(Dialect::Postgres),
                        &[&schema, &name],
                    )
                    .await
            })?;
            let count: i64 = row.get(0);
            Ok(count > 0)
        }

        fn create_table(&mut self, table: &TableName) -> Result<(), LoadError> {
            let Self { runtime, client } = self;
            let ddl = DestinationSchema::create_table(Dialect::Postgres, table);
            runtime
                .block_on(async { client.batch_execute(&ddl).await })
                .map_err(|e| LoadError::Schema {
                    table: table.qualified(),
                    message: e.to_string(),
                })
        }

        fn insert_batch(
            &mut self,
            table: &TableName,
            rows: &[PreparedRow],
        ) -> Result<usize, LoadError> {
            if rows.is_empty() {
                return Ok(0);
            }
            let Self { runtime, client } = self;
            let sql = DestinationSchema::insert_rows(Dialect::Postgres, table, rows.len());
            let params: Vec<&(dyn ToSql + Sync)> = rows
                .iter()
                .flat_map(|row| {
                    [
                        &row.customer_name as &(dyn ToSql + Sync),
                        &row.address as &(dyn ToSql + Sync),
                        &row.birth_date as &(dyn ToSql + Sync),
                        &row.run_id as &(dyn ToSql + Sync),
                    ]
                })
                .collect();

            let inserted = runtime.block_on(async {
                let tx = client.transaction().await?;
                let inserted = tx.execute(sql.as_str(), &params).await?;
                tx.commit().await?;
                Ok::<u64, tokio_postgres::Error>(inserted)
            })?;
            Ok(inserted as usize)
        }
    }
}
