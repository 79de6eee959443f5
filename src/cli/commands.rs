//! Subcommand handlers

use anyhow::{Context, Result};
use csv_loader::{
    BackendKind, ConnectionDescriptor, ConnectionRegistry, Loader, LoaderConfig, PipelineExecutor,
    SchemaEnsurer,
};
use uuid::Uuid;

use crate::output;
use crate::{LoadArgs, TargetArgs};

/// Loader configuration with command line overrides applied, and its connection
struct Settings {
    config: LoaderConfig,
    descriptor: ConnectionDescriptor,
}

fn resolve_target(args: &TargetArgs, mut config: LoaderConfig) -> Result<Settings> {
    if let Some(table) = &args.table {
        config.table = table.clone();
    }
    if let Some(conn_id) = &args.conn_id {
        config.connection_id = conn_id.clone();
    }
    config.validate()?;

    let registry = match &args.connections {
        Some(path) => ConnectionRegistry::from_file(path)?,
        None => ConnectionRegistry::new(),
    };
    let descriptor = registry.resolve(&config.connection_id)?;
    match descriptor.backend {
        BackendKind::DuckDb => tracing::debug!(connection = %descriptor, "Resolved connection"),
        BackendKind::Postgres => tracing::debug!(
            connection = %descriptor,
            driver = %descriptor.redacted_connection_string(),
            "Resolved connection"
        ),
    }

    Ok(Settings { config, descriptor })
}

fn base_config(args: &TargetArgs) -> Result<LoaderConfig> {
    match &args.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(LoaderConfig::default()),
    }
}

fn resolve_load(args: &LoadArgs) -> Result<Settings> {
    let mut config = base_config(&args.target)?;
    if let Some(source) = &args.source {
        config.source_path = source.clone();
    }
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    resolve_target(&args.target, config)
}

fn run_id(args: &LoadArgs) -> String {
    args.run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Handle the `ensure-table` command
pub fn handle_ensure_table(args: &TargetArgs) -> Result<()> {
    let settings = resolve_target(args, base_config(args)?)?;
    let ensurer = SchemaEnsurer::from_config(&settings.config, settings.descriptor)?;
    let outcome = ensurer.ensure()?;

    if args.json {
        output::print_json(&serde_json::json!({
            "table": ensurer.table().to_string(),
            "outcome": outcome,
        }))
    } else {
        println!("{}", output::format_ensure_outcome(ensurer.table(), outcome));
        Ok(())
    }
}

/// Handle the `load` command
pub fn handle_load(args: &LoadArgs) -> Result<()> {
    let settings = resolve_load(args)?;
    let run_id = run_id(args);
    let report = Loader::new(settings.config, settings.descriptor)?.load(&run_id)?;

    if args.target.json {
        output::print_json(&report)
    } else {
        println!("{}", output::format_load_report(&report));
        Ok(())
    }
}

/// Handle the `run` command
pub fn handle_run(args: &LoadArgs) -> Result<()> {
    let settings = resolve_load(args)?;
    let executor =
        PipelineExecutor::new(settings.config, settings.descriptor)?.with_run_id(run_id(args))?;
    let report = executor.run()?;

    if args.target.json {
        output::print_json(&report)
    } else {
        for line in report.summary() {
            println!("{line}");
        }
        Ok(())
    }
}
