//! Connection descriptors for the destination database
//!
//! A descriptor is resolved once per operation from the [`ConnectionRegistry`]
//! and handed to a [`crate::load::Connector`]. It is never persisted, and its
//! `Debug` output never shows the password.

mod error;
mod registry;

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub use error::RegistryError;
pub use registry::{ConnectionRegistry, ENV_PREFIX, env_var_name, parse_uri};

/// Default ODBC driver name used when a registry entry does not name one
pub const DEFAULT_DRIVER: &str = "ODBC Driver 18 for SQL Server";

/// Port used in the rendered driver string when none is configured
pub const DEFAULT_ODBC_PORT: u16 = 1433;

/// Database backend a descriptor points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded DuckDB database file
    #[serde(alias = "duck")]
    DuckDb,
    /// PostgreSQL server
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl BackendKind {
    /// Map a URI scheme onto a backend
    pub fn from_scheme(scheme: &str) -> Result<Self, RegistryError> {
        match scheme.to_lowercase().as_str() {
            "duckdb" | "duck" => Ok(BackendKind::DuckDb),
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            other => Err(RegistryError::UnsupportedBackend(other.to_string())),
        }
    }

    /// Canonical scheme name
    pub fn scheme(&self) -> &'static str {
        match self {
            BackendKind::DuckDb => "duckdb",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Optional driver settings carried alongside a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionExtras {
    /// Driver name (only used in the rendered ODBC string)
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Require an encrypted transport
    #[serde(
        rename = "Encrypt",
        alias = "encrypt",
        default,
        deserialize_with = "deserialize_flag"
    )]
    pub encrypt: bool,
    /// Trust the server certificate without validation
    #[serde(
        rename = "TrustServerCertificate",
        alias = "trust_server_certificate",
        default = "default_trust",
        deserialize_with = "deserialize_flag"
    )]
    pub trust_server_certificate: bool,
}

impl Default for ConnectionExtras {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            encrypt: false,
            trust_server_certificate: default_trust(),
        }
    }
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

fn default_trust() -> bool {
    true
}

/// Parse a yes/no style flag as found in driver option strings
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => parse_flag(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid flag '{s}', expected yes or no"))),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Resolved connection settings for one destination
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Registry key this descriptor was resolved from
    #[serde(skip)]
    pub id: String,
    /// Backend to connect with
    #[serde(alias = "conn_type")]
    pub backend: BackendKind,
    /// Server host (unused by DuckDB)
    #[serde(default)]
    pub host: Option<String>,
    /// Server port
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name, or the database file path for DuckDB
    #[serde(default, alias = "schema")]
    pub database: Option<String>,
    /// Login name
    #[serde(default)]
    pub login: Option<String>,
    /// Password
    #[serde(default)]
    pub password: Option<String>,
    /// Driver options
    #[serde(default, alias = "extra")]
    pub extras: ConnectionExtras,
}

impl ConnectionDescriptor {
    /// Create a descriptor for a backend with no settings filled in
    pub fn new(id: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            id: id.into(),
            backend,
            host: None,
            port: None,
            database: None,
            login: None,
            password: None,
            extras: ConnectionExtras::default(),
        }
    }

    /// Descriptor for a DuckDB database file
    pub fn duckdb(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(id, BackendKind::DuckDb).with_database(path)
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name or file path
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set login and password
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.password = Some(password.into());
        self
    }

    /// Set driver options
    pub fn with_extras(mut self, extras: ConnectionExtras) -> Self {
        self.extras = extras;
        self
    }

    /// Human-readable target without credentials, for logs and errors
    pub fn target(&self) -> String {
        match self.backend {
            BackendKind::DuckDb => format!(
                "duckdb://{}",
                self.database.as_deref().unwrap_or(":memory:")
            ),
            BackendKind::Postgres => {
                let mut out = String::from("postgres://");
                if let Some(login) = &self.login {
                    out.push_str(login);
                    out.push('@');
                }
                out.push_str(self.host.as_deref().unwrap_or("localhost"));
                if let Some(port) = self.port {
                    out.push_str(&format!(":{port}"));
                }
                if let Some(db) = &self.database {
                    out.push('/');
                    out.push_str(db);
                }
                out
            }
        }
    }

    /// Render the ODBC-style driver connection string
    pub fn odbc_connection_string(&self) -> String {
        self.render_odbc(self.password.as_deref().unwrap_or(""))
    }

    /// Render the driver connection string with the password masked
    pub fn redacted_connection_string(&self) -> String {
        let mask = if self.password.is_some() { "***" } else { "" };
        self.render_odbc(mask)
    }

    fn render_odbc(&self, password: &str) -> String {
        format!(
            "DRIVER={{{}}};SERVER={},{};DATABASE={};UID={};PWD={};Encrypt={};TrustServerCertificate={};",
            self.extras.driver,
            self.host.as_deref().unwrap_or(""),
            self.port.unwrap_or(DEFAULT_ODBC_PORT),
            self.database.as_deref().unwrap_or(""),
            self.login.as_deref().unwrap_or(""),
            password,
            yes_no(self.extras.encrypt),
            yes_no(self.extras.trust_server_certificate),
        )
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("extras", &self.extras)
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConnectionDescriptor {
        ConnectionDescriptor::new("mssql_docker", BackendKind::Postgres)
            .with_host("db.internal")
            .with_database("warehouse")
            .with_credentials("loader", "s3cret")
    }

    #[test]
    fn test_extras_defaults() {
        let extras = ConnectionExtras::default();
        assert_eq!(extras.driver, "ODBC Driver 18 for SQL Server");
        assert!(!extras.encrypt);
        assert!(extras.trust_server_certificate);
    }

    #[test]
    fn test_odbc_connection_string_uses_defaults() {
        let rendered = sample().odbc_connection_string();
        assert_eq!(
            rendered,
            "DRIVER={ODBC Driver 18 for SQL Server};SERVER=db.internal,1433;DATABASE=warehouse;\
             UID=loader;PWD=s3cret;Encrypt=no;TrustServerCertificate=yes;"
        );
    }

    #[test]
    fn test_redacted_forms_hide_password() {
        let descriptor = sample().with_port(5432);
        assert!(!descriptor.redacted_connection_string().contains("s3cret"));
        assert!(descriptor.redacted_connection_string().contains("PWD=***;"));
        assert!(!format!("{descriptor:?}").contains("s3cret"));
        assert_eq!(descriptor.target(), "postgres://loader@db.internal:5432/warehouse");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("yes"), Some(true));
        assert_eq!(parse_flag(" NO "), Some(false));
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_backend_from_scheme() {
        assert_eq!(BackendKind::from_scheme("postgresql").unwrap(), BackendKind::Postgres);
        assert_eq!(BackendKind::from_scheme("DuckDB").unwrap(), BackendKind::DuckDb);
        assert!(matches!(
            BackendKind::from_scheme("mssql"),
            Err(RegistryError::UnsupportedBackend(_))
        ));
    }
}
