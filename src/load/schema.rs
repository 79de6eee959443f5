//! Destination table definition and SQL rendering
//!
//! Table names are validated identifiers, so they are interpolated into DDL
//! and INSERT text. Row values are always bound as parameters.

use std::fmt;
use std::str::FromStr;

use super::error::LoadError;

/// Maximum length of `customer_name`
pub const CUSTOMER_NAME_MAX_LEN: usize = 150;

/// Maximum length of `address`
pub const ADDRESS_MAX_LEN: usize = 250;

/// Maximum length of `run_id`
pub const RUN_ID_MAX_LEN: usize = 250;

/// Columns written by the loader, in bind order
pub const INSERT_COLUMNS: [&str; 4] = ["customer_name", "address", "birth_date", "run_id"];

const MAX_IDENTIFIER_LEN: usize = 63;

/// SQL dialect of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DuckDb,
    Postgres,
}

/// Validated, optionally schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Parse `table` or `schema.table`; identifiers are folded to lowercase
    pub fn parse(raw: &str) -> Result<Self, LoadError> {
        let invalid = || LoadError::InvalidTableName(raw.to_string());
        let parts: Vec<&str> = raw.trim().split('.').collect();
        let (schema, name) = match parts.as_slice() {
            [name] => (None, *name),
            [schema, name] => (Some(*schema), *name),
            _ => return Err(invalid()),
        };

        if !is_identifier(name) || schema.is_some_and(|s| !is_identifier(s)) {
            return Err(invalid());
        }

        Ok(Self {
            schema: schema.map(str::to_lowercase),
            name: name.to_lowercase(),
        })
    }

    /// Schema part, if qualified
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Unqualified table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as written in SQL
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Sequence backing the surrogate key on DuckDB
    pub fn sequence_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}_id_seq", self.name),
            None => format!("{}_id_seq", self.name),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for TableName {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// SQL for the destination table
pub struct DestinationSchema;

impl DestinationSchema {
    /// DDL creating the table and its supporting objects if absent
    pub fn create_table(dialect: Dialect, table: &TableName) -> String {
        let mut ddl = String::new();
        if let Some(schema) = table.schema() {
            ddl.push_str(&format!("CREATE SCHEMA IF NOT EXISTS {schema};\n"));
        }

        let qualified = table.qualified();
        match dialect {
            Dialect::DuckDb => {
                let seq = table.sequence_name();
                ddl.push_str(&format!(
                    "CREATE SEQUENCE IF NOT EXISTS {seq} START 1;\n\
                     CREATE TABLE IF NOT EXISTS {qualified} (\n    \
                         id BIGINT PRIMARY KEY DEFAULT nextval('{seq}'),\n    \
                         customer_name VARCHAR NOT NULL CHECK (length(customer_name) <= {CUSTOMER_NAME_MAX_LEN}),\n    \
                         address VARCHAR CHECK (length(address) <= {ADDRESS_MAX_LEN}),\n    \
                         birth_date DATE,\n    \
                         run_id VARCHAR CHECK (length(run_id) <= {RUN_ID_MAX_LEN}),\n    \
                         loaded_at TIMESTAMP DEFAULT current_timestamp\n\
                     );\n"
                ));
            }
            Dialect::Postgres => {
                ddl.push_str(&format!(
                    "CREATE TABLE IF NOT EXISTS {qualified} (\n    \
                         id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,\n    \
                         customer_name VARCHAR({CUSTOMER_NAME_MAX_LEN}) NOT NULL,\n    \
                         address VARCHAR({ADDRESS_MAX_LEN}),\n    \
                         birth_date DATE,\n    \
                         run_id VARCHAR({RUN_ID_MAX_LEN}),\n    \
                         loaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                     );\n"
                ));
            }
        }
        ddl
    }

    /// Query counting tables matching (schema, name)
    ///
    /// DuckDB binds the schema as text (`main` when unqualified); PostgreSQL
    /// binds it as nullable text and falls back to `current_schema()`.
    pub fn table_exists(dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::DuckDb => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?"
            }
            Dialect::Postgres => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = COALESCE($1::text, current_schema()) AND table_name = $2"
            }
        }
    }

    /// Multi-row parameterized INSERT for `rows` rows
    pub fn insert_rows(dialect: Dialect, table: &TableName, rows: usize) -> String {
        let columns = INSERT_COLUMNS.join(", ");
        let tuples: Vec<String> = (0..rows)
            .map(|i| match dialect {
                Dialect::DuckDb => "(?, ?, CAST(? AS DATE), ?)".to_string(),
                Dialect::Postgres => {
                    let base = i * INSERT_COLUMNS.len();
                    format!("(${}, ${}, ${}, ${})", base + 1, base + 2, base + 3, base + 4)
                }
            })
            .collect();
        format!(
            "INSERT INTO {} ({columns}) VALUES {}",
            table.qualified(),
            tuples.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_parse() {
        let table = TableName::parse("dbo.Unique_Values").unwrap();
        assert_eq!(table.schema(), Some("dbo"));
        assert_eq!(table.name(), "unique_values");
        assert_eq!(table.qualified(), "dbo.unique_values");
        assert_eq!(table.sequence_name(), "dbo.unique_values_id_seq");

        let table: TableName = "customers".parse().unwrap();
        assert_eq!(table.schema(), None);
        assert_eq!(table.to_string(), "customers");
    }

    #[test]
    fn test_table_name_rejects_injection() {
        for raw in ["", "a.b.c", "1abc", "users; drop table x", "t-1", "\"quoted\"", "a."] {
            assert!(
                matches!(TableName::parse(raw), Err(LoadError::InvalidTableName(_))),
                "{raw} should be rejected"
            );
        }
        assert!(TableName::parse(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_duckdb_ddl() {
        let table = TableName::parse("dbo.unique_values").unwrap();
        let ddl = DestinationSchema::create_table(Dialect::DuckDb, &table);
        assert!(ddl.starts_with("CREATE SCHEMA IF NOT EXISTS dbo;"));
        assert!(ddl.contains("CREATE SEQUENCE IF NOT EXISTS dbo.unique_values_id_seq"));
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS dbo.unique_values"));
        assert!(ddl.contains("length(customer_name) <= 150"));
        assert!(ddl.contains("length(address) <= 250"));
        assert!(ddl.contains("loaded_at TIMESTAMP DEFAULT current_timestamp"));
    }

    #[test]
    fn test_postgres_ddl_without_schema() {
        let table = TableName::parse("unique_values").unwrap();
        let ddl = DestinationSchema::create_table(Dialect::Postgres, &table);
        assert!(!ddl.contains("CREATE SCHEMA"));
        assert!(ddl.contains("GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
        assert!(ddl.contains("customer_name VARCHAR(150) NOT NULL"));
        assert!(ddl.contains("run_id VARCHAR(250)"));
    }

    #[test]
    fn test_insert_placeholders() {
        let table = TableName::parse("t").unwrap();
        assert_eq!(
            DestinationSchema::insert_rows(Dialect::DuckDb, &table, 2),
            "INSERT INTO t (customer_name, address, birth_date, run_id) VALUES \
             (?, ?, CAST(? AS DATE), ?), (?, ?, CAST(? AS DATE), ?)"
        );
        assert_eq!(
            DestinationSchema::insert_rows(Dialect::Postgres, &table, 2),
            "INSERT INTO t (customer_name, address, birth_date, run_id) VALUES \
             ($1, $2, $3, $4), ($5, $6, $7, $8)"
        );
    }
}
