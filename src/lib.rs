//! CSV loader - ensure a destination table, then load a delimited file into it
//!
//! Provides:
//! - Connection descriptors resolved from a registry (TOML file or environment URIs)
//! - A schema ensurer that creates the destination table at most once
//! - A loader that validates, cleans and caps source rows, then inserts them in
//!   committed batches tagged with a run identifier
//! - A two-stage pipeline executor that sequences the two steps

pub mod connection;
pub mod load;
pub mod pipeline;

// Re-export commonly used types
pub use connection::{BackendKind, ConnectionDescriptor, ConnectionExtras, ConnectionRegistry};
pub use load::{
    Connector, DefaultConnector, EnsureOutcome, LoadError, LoadOutcome, LoadReport, Loader,
    LoaderConfig, MAX_RECORDS, PreparedRow, SchemaEnsurer, Session, TableName,
};
pub use pipeline::{PipelineError, PipelineExecutor, PipelineReport, PipelineStage, run_pipeline};
