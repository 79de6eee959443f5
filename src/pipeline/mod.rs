//! Two-stage pipeline: ensure the destination table, then load the file
//!
//! # Example
//!
//! ```rust,ignore
//! use csv_loader::{ConnectionRegistry, LoaderConfig, PipelineExecutor};
//!
//! let config = LoaderConfig::from_file("loader.toml")?;
//! let descriptor = ConnectionRegistry::from_file("connections.toml")?
//!     .resolve(&config.connection_id)?;
//!
//! let report = PipelineExecutor::new(config, descriptor)?
//!     .with_run_id("scheduled__2024-06-01")?
//!     .run()?;
//!
//! println!("Pipeline completed in {}", report.duration_formatted());
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **EnsureTable**: Create the destination table if it does not exist
//! 2. **Load**: Validate, clean and cap the source rows, then insert them
//!
//! A failing stage ends the run; the load stage never starts if the table
//! could not be ensured.

mod error;
mod executor;
mod stage;

pub use error::{PipelineError, PipelineResult};
pub use executor::{PipelineExecutor, PipelineReport};
pub use stage::PipelineStage;

use crate::connection::ConnectionDescriptor;
use crate::load::LoaderConfig;

/// Run both stages with the given configuration
///
/// This is a convenience function for simple pipeline execution.
pub fn run_pipeline(
    config: LoaderConfig,
    descriptor: ConnectionDescriptor,
    run_id: &str,
) -> PipelineResult<PipelineReport> {
    PipelineExecutor::new(config, descriptor)?
        .with_run_id(run_id)?
        .run()
}
