//! csv-loader command line
//!
//! ```text
//! csv-loader run --connections connections.toml --conn-id warehouse \
//!     --source "/opt/data/file 2.csv" --table dbo.unique_values
//! ```

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use csv_loader::PipelineError;
use csv_loader::connection::RegistryError;
use csv_loader::load::LoadError;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "csv-loader",
    version,
    about = "Ensure a destination table exists and load a delimited file into it"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the destination table if it does not exist
    EnsureTable(TargetArgs),
    /// Load the source file into the destination table
    Load(LoadArgs),
    /// Ensure the table, then load the source file
    Run(LoadArgs),
}

/// Where to write
#[derive(Args)]
pub struct TargetArgs {
    /// Loader configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Connection registry file (TOML)
    #[arg(long)]
    pub connections: Option<PathBuf>,

    /// Connection identifier in the registry
    #[arg(long)]
    pub conn_id: Option<String>,

    /// Destination table, optionally schema-qualified
    #[arg(long)]
    pub table: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// What to read and how to tag it
#[derive(Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Source file
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Field delimiter
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Rows per insert batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Run identifier stamped on every row (generated when omitted)
    #[arg(long)]
    pub run_id: Option<String>,
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn user_message(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        e.user_message()
    } else if let Some(e) = err.downcast_ref::<LoadError>() {
        e.user_message()
    } else if let Some(e) = err.downcast_ref::<RegistryError>() {
        e.user_message()
    } else {
        format!("{err:#}")
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::EnsureTable(args) => commands::handle_ensure_table(args),
        Command::Load(args) => commands::handle_load(args),
        Command::Run(args) => commands::handle_run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", user_message(&err));
            ExitCode::FAILURE
        }
    }
}
