//! Pipeline executor sequencing table creation and loading

use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, info_span};
use uuid::Uuid;

use super::error::{PipelineError, PipelineResult};
use super::stage::PipelineStage;
use crate::connection::ConnectionDescriptor;
use crate::load::{
    Connector, DefaultConnector, EnsureOutcome, LoadError, LoadReport, Loader, LoaderConfig,
    SchemaEnsurer, TableName, validate_run_id,
};

/// Pipeline executor that runs both stages in order
pub struct PipelineExecutor<C: Connector = DefaultConnector> {
    config: LoaderConfig,
    table: TableName,
    descriptor: ConnectionDescriptor,
    connector: C,
    run_id: String,
}

impl PipelineExecutor<DefaultConnector> {
    /// Create a new pipeline executor with a generated run identifier
    pub fn new(config: LoaderConfig, descriptor: ConnectionDescriptor) -> PipelineResult<Self> {
        Self::with_connector(config, descriptor, DefaultConnector)
    }
}

impl<C: Connector> PipelineExecutor<C> {
    /// Create an executor with a custom connector
    pub fn with_connector(
        config: LoaderConfig,
        descriptor: ConnectionDescriptor,
        connector: C,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let table = config.table_name()?;
        Ok(Self {
            config,
            table,
            descriptor,
            connector,
            run_id: Uuid::new_v4().to_string(),
        })
    }

    /// Use a caller-supplied run identifier
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> PipelineResult<Self> {
        let run_id = run_id.into();
        validate_run_id(&run_id)?;
        self.run_id = run_id;
        Ok(self)
    }

    /// Run identifier stamped on loaded rows
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run the pipeline
    ///
    /// The load stage only starts once the table is known to exist.
    pub fn run(&self) -> PipelineResult<PipelineReport> {
        let _span = info_span!("pipeline_run", run_id = %self.run_id).entered();
        let start = Instant::now();

        info!(
            run_id = %self.run_id,
            stages = ?PipelineStage::all().iter().map(|s| s.name()).collect::<Vec<_>>(),
            table = %self.table,
            "Starting pipeline"
        );

        let schema = self.run_stage(PipelineStage::EnsureTable, || {
            SchemaEnsurer::with_connector(
                self.table.clone(),
                self.descriptor.clone(),
                &self.connector,
            )
            .ensure()
        })?;

        let load = self.run_stage(PipelineStage::Load, || {
            Loader::with_connector(self.config.clone(), self.descriptor.clone(), &self.connector)?
                .load(&self.run_id)
        })?;

        let duration = start.elapsed();
        info!(
            run_id = %self.run_id,
            duration_ms = duration.as_millis() as u64,
            rows_inserted = load.rows_inserted,
            "Pipeline completed"
        );

        Ok(PipelineReport {
            run_id: self.run_id.clone(),
            stages_completed: PipelineStage::all(),
            schema,
            load,
            duration_ms: duration.as_millis() as u64,
        })
    }

    fn run_stage<T>(
        &self,
        stage: PipelineStage,
        body: impl FnOnce() -> Result<T, LoadError>,
    ) -> PipelineResult<T> {
        let _stage_span = info_span!("pipeline_stage", stage = stage.name()).entered();
        info!(
            stage = stage.name(),
            step = stage.index(),
            description = stage.description(),
            "Starting stage"
        );
        let start = Instant::now();

        match body() {
            Ok(output) => {
                info!(
                    stage = stage.name(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Stage completed"
                );
                Ok(output)
            }
            Err(e) => {
                error!(stage = stage.name(), error = %e, "Stage failed");
                Err(PipelineError::stage_failure(stage, e))
            }
        }
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Run ID
    pub run_id: String,
    /// Completed stages
    pub stages_completed: Vec<PipelineStage>,
    /// Result of the table check
    pub schema: EnsureOutcome,
    /// Load statistics
    pub load: LoadReport,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            format!("{}ms", self.duration_ms)
        }
    }

    /// Human-readable summary lines
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Pipeline {} completed in {}",
            self.run_id,
            self.duration_formatted()
        )];
        for stage in &self.stages_completed {
            let result = match stage {
                PipelineStage::EnsureTable => match self.schema {
                    EnsureOutcome::Created => format!("{} created", self.load.table),
                    EnsureOutcome::AlreadyExists => format!("{} already existed", self.load.table),
                },
                PipelineStage::Load => format!(
                    "read {}, dropped {}, over cap {}, inserted {}",
                    self.load.rows_read,
                    self.load.rows_dropped,
                    self.load.rows_over_cap,
                    self.load.rows_inserted
                ),
            };
            lines.push(format!(
                "  {}. {}: {}",
                stage.index(),
                stage.description(),
                result
            ));
        }
        lines
    }
}
