//! Integration tests for table creation and CSV loading against DuckDB
//!
//! Each test works on a fresh database file in a temporary directory and
//! reads the table back with a separate connection once the loader is done.

#![cfg(feature = "duckdb-backend")]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;

use csv_loader::connection::{ConnectionRegistry, env_var_name};
use csv_loader::load::{
    Connector, DefaultConnector, Dialect, EnsureOutcome, LoadError, LoadOutcome, Loader,
    LoaderConfig, MAX_RECORDS, PreparedRow, SchemaEnsurer, Session, TableName,
};
use csv_loader::{ConnectionDescriptor, PipelineStage, run_pipeline};

const TABLE: &str = "dbo.unique_values";
const HEADER: &str = "customer_name;address;birth_date\n";

struct Fixture {
    dir: TempDir,
    db_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("destination.duckdb");
        Self { dir, db_path }
    }

    fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::duckdb("test", self.db_path.to_string_lossy())
    }

    fn write_csv(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write CSV");
        path
    }

    fn config(&self, source: &Path, batch_size: usize) -> LoaderConfig {
        LoaderConfig::builder()
            .source_path(source)
            .table(TABLE)
            .batch_size(batch_size)
            .build()
            .unwrap()
    }

    fn ensure(&self) -> EnsureOutcome {
        SchemaEnsurer::new(TableName::parse(TABLE).unwrap(), self.descriptor())
            .ensure()
            .unwrap()
    }

    /// (customer_name, address, birth_date, run_id) in insertion order
    fn rows(&self) -> Vec<(String, Option<String>, Option<String>, Option<String>)> {
        let conn = duckdb::Connection::open(&self.db_path).unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT customer_name, address, CAST(birth_date AS VARCHAR), run_id \
                 FROM {TABLE} ORDER BY id"
            ))
            .unwrap();
        stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
    }

    fn names(&self) -> Vec<String> {
        self.rows().into_iter().map(|r| r.0).collect()
    }
}

/// Counts sessions opened and DDL executed through the default connector
#[derive(Default)]
struct CountingConnector {
    connects: Rc<Cell<usize>>,
    ddl: Rc<Cell<usize>>,
}

struct CountingSession {
    inner: Box<dyn Session>,
    ddl: Rc<Cell<usize>>,
}

impl Session for CountingSession {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn table_exists(&mut self, table: &TableName) -> Result<bool, LoadError> {
        self.inner.table_exists(table)
    }

    fn create_table(&mut self, table: &TableName) -> Result<(), LoadError> {
        self.ddl.set(self.ddl.get() + 1);
        self.inner.create_table(table)
    }

    fn insert_batch(&mut self, table: &TableName, rows: &[PreparedRow]) -> Result<usize, LoadError> {
        self.inner.insert_batch(table, rows)
    }
}

impl Connector for CountingConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>, LoadError> {
        self.connects.set(self.connects.get() + 1);
        Ok(Box::new(CountingSession {
            inner: DefaultConnector.connect(descriptor)?,
            ddl: Rc::clone(&self.ddl),
        }))
    }
}

fn numbered_rows(count: usize) -> String {
    let mut content = String::from(HEADER);
    for i in 0..count {
        content.push_str(&format!("name{i:02};{i} Main St;1990-01-{:02}\n", i % 28 + 1));
    }
    content
}

#[test]
fn test_ensure_table_is_idempotent() {
    let fx = Fixture::new();
    let counting = CountingConnector::default();
    let ensurer = SchemaEnsurer::with_connector(
        TableName::parse(TABLE).unwrap(),
        fx.descriptor(),
        &counting,
    );

    assert_eq!(ensurer.ensure().unwrap(), EnsureOutcome::Created);
    assert_eq!(ensurer.ensure().unwrap(), EnsureOutcome::AlreadyExists);
    assert_eq!(counting.ddl.get(), 1);
    assert_eq!(counting.connects.get(), 2);

    let conn = duckdb::Connection::open(&fx.db_path).unwrap();
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'dbo' AND table_name = 'unique_values'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn test_loads_first_fifty_records_in_file_order() {
    let fx = Fixture::new();
    fx.ensure();
    let source = fx.write_csv("many.csv", &numbered_rows(75));

    let report = Loader::new(fx.config(&source, 50), fx.descriptor())
        .unwrap()
        .load("run-cap")
        .unwrap();

    assert_eq!(report.rows_read, 75);
    assert_eq!(report.rows_inserted, MAX_RECORDS);
    assert_eq!(report.rows_over_cap, 25);

    let names = fx.names();
    let expected: Vec<String> = (0..MAX_RECORDS).map(|i| format!("name{i:02}")).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_blank_names_never_reach_the_table() {
    let fx = Fixture::new();
    fx.ensure();
    let source = fx.write_csv(
        "blank.csv",
        "Birth_Date ; CUSTOMER_NAME ;extra;Address\n\
         1990-03-12;  Alice  ;x;1 Main St\n\
         1990-03-13;   ;x;2 Main St\n\
         1990-03-14;;x;3 Main St\n\
         1990-03-15;Bob;x;4 Main St\n",
    );

    let report = Loader::new(fx.config(&source, 50), fx.descriptor())
        .unwrap()
        .load("run-blank")
        .unwrap();

    assert_eq!(report.rows_dropped, 2);
    assert_eq!(fx.names(), vec!["Alice", "Bob"]);
}

#[test]
fn test_unparseable_birth_date_is_null() {
    let fx = Fixture::new();
    fx.ensure();
    let source = fx.write_csv(
        "dates.csv",
        &format!("{HEADER}Alice;NA;31/31/1990\nBob;2 Main St;12 March 1990\nCarol;;\n"),
    );

    let report = Loader::new(fx.config(&source, 50), fx.descriptor())
        .unwrap()
        .load("run-dates")
        .unwrap();
    assert_eq!(report.unparsed_dates, 1);

    let rows = fx.rows();
    assert_eq!(rows[0].1, None);
    assert_eq!(rows[0].2, None);
    assert_eq!(rows[1].2.as_deref(), Some("1990-03-12"));
    assert_eq!(rows[2], ("Carol".to_string(), None, None, Some("run-dates".to_string())));
}

#[test]
fn test_out_of_range_year_does_not_fail_its_batch() {
    let fx = Fixture::new();
    fx.ensure();
    let source = fx.write_csv(
        "years.csv",
        &format!(
            "{HEADER}Alice;x;+12345-01-01\nBob;y;1990-01-01\n\
             Carol;z;0000-01-01 00:00:00\nDan;w;00000101\n"
        ),
    );

    let report = Loader::new(fx.config(&source, 50), fx.descriptor())
        .unwrap()
        .load("run-years")
        .unwrap();
    assert_eq!(report.rows_inserted, 4);
    assert_eq!(report.unparsed_dates, 3);

    let dates: Vec<(String, Option<String>)> =
        fx.rows().into_iter().map(|r| (r.0, r.2)).collect();
    assert_eq!(
        dates,
        vec![
            ("Alice".to_string(), None),
            ("Bob".to_string(), Some("1990-01-01".to_string())),
            ("Carol".to_string(), None),
            ("Dan".to_string(), None),
        ]
    );
}

#[test]
fn test_run_id_is_stamped_per_run() {
    let fx = Fixture::new();
    fx.ensure();
    let first = fx.write_csv("first.csv", &numbered_rows(3));
    let second = fx.write_csv("second.csv", &numbered_rows(2));

    Loader::new(fx.config(&first, 50), fx.descriptor())
        .unwrap()
        .load("run-A")
        .unwrap();
    Loader::new(fx.config(&second, 50), fx.descriptor())
        .unwrap()
        .load("run-B")
        .unwrap();

    let run_ids: Vec<Option<String>> = fx.rows().into_iter().map(|r| r.3).collect();
    assert_eq!(run_ids.len(), 5);
    assert!(run_ids[..3].iter().all(|r| r.as_deref() == Some("run-A")));
    assert!(run_ids[3..].iter().all(|r| r.as_deref() == Some("run-B")));
}

#[test]
fn test_failed_batch_keeps_earlier_commits() {
    let fx = Fixture::new();
    fx.ensure();
    let too_long = "x".repeat(151);
    let source = fx.write_csv(
        "partial.csv",
        &format!("{HEADER}a;;\nb;;\nc;;\n{too_long};;\ne;;\n"),
    );

    let err = Loader::new(fx.config(&source, 2), fx.descriptor())
        .unwrap()
        .load("run-partial")
        .unwrap_err();

    match err {
        LoadError::Insert {
            batch,
            first_row,
            last_row,
            committed,
            ..
        } => assert_eq!((batch, first_row, last_row, committed), (2, 3, 4, 2)),
        other => panic!("expected insert error, got {other}"),
    }
    assert_eq!(fx.names(), vec!["a", "b"]);
}

#[test]
fn test_missing_column_fails_before_connecting() {
    let fx = Fixture::new();
    fx.ensure();
    let source = fx.write_csv("missing.csv", "customer_name;address\nAlice;1 Main St\n");
    let counting = CountingConnector::default();

    let err = Loader::with_connector(fx.config(&source, 50), fx.descriptor(), &counting)
        .unwrap()
        .load("run-missing")
        .unwrap_err();

    match &err {
        LoadError::SchemaMismatch { missing, found } => {
            assert_eq!(missing, &vec!["birth_date".to_string()]);
            assert_eq!(found, &vec!["customer_name".to_string(), "address".to_string()]);
        }
        other => panic!("expected schema mismatch, got {other}"),
    }
    assert_eq!(counting.connects.get(), 0);
    assert!(fx.rows().is_empty());
}

#[test]
fn test_header_only_file_is_a_no_op() {
    let fx = Fixture::new();
    let source = fx.write_csv("empty.csv", HEADER);
    let counting = CountingConnector::default();

    let report = Loader::with_connector(fx.config(&source, 50), fx.descriptor(), &counting)
        .unwrap()
        .load("run-empty")
        .unwrap();

    assert_eq!(report.outcome, LoadOutcome::Empty);
    assert_eq!(report.rows_inserted, 0);
    assert_eq!(counting.connects.get(), 0);
    assert!(!fx.db_path.exists());
}

#[test]
fn test_pipeline_with_connection_from_environment() {
    let fx = Fixture::new();
    let source = fx.write_csv("pipeline.csv", &numbered_rows(4));
    let registry = ConnectionRegistry::new();
    let uri = format!("duckdb://{}", fx.db_path.display());
    let descriptor = registry
        .resolve_with("warehouse", |name| {
            (name == env_var_name("warehouse")).then(|| uri.clone())
        })
        .unwrap();

    let report = run_pipeline(fx.config(&source, 3), descriptor, "run-env").unwrap();

    assert_eq!(report.schema, EnsureOutcome::Created);
    assert_eq!(report.load.rows_inserted, 4);
    assert_eq!(report.load.batches_committed, 2);
    assert_eq!(
        report.stages_completed,
        vec![PipelineStage::EnsureTable, PipelineStage::Load]
    );
    assert_eq!(fx.names().len(), 4);
}

#[test]
fn test_pipeline_load_failure_is_reported_by_stage() {
    let fx = Fixture::new();
    let source = fx.write_csv("bad.csv", "name;address;birth_date\nAlice;;\n");

    let err = run_pipeline(fx.config(&source, 50), fx.descriptor(), "run-bad").unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Load));
    assert!(err.to_string().contains("customer_name"));
    // The table was still created by the first stage
    assert!(fx.rows().is_empty());
}
