mod commands;
mod error;
mod util;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use crate::commands::{calls, completions, contacts, export, import, Context};
use crate::error::{exit_code_for, report_error};
use dimicall_config as config;
use dimicall_store::{paths, Store};

#[derive(Debug, Parser)]
#[command(name = "dimicall", version, about = "Contact ingestion and call tracking")]
struct Cli {
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import contacts from a CSV, TSV or spreadsheet file
    Import(import::ImportArgs),
    /// Show how the columns of a file would be mapped
    Mapping(import::MappingArgs),
    /// List past imports
    Runs,
    List(contacts::ListArgs),
    Show(contacts::ShowArgs),
    /// Record one more call attempt on a contact
    #[command(name = "record-call")]
    RecordCall(calls::RecordCallArgs),
    /// Compute the duration between two instants
    #[command(name = "call-duration")]
    CallDuration(calls::CallDurationArgs),
    #[command(subcommand)]
    Export(export::ExportCommand),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, verbose);
            exit_code_for(&err)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        db_path,
        config: config_path,
        json,
        verbose: _,
        command,
    } = cli;

    match command {
        Command::Completions(args) => completions::emit(args),
        Command::CallDuration(args) => calls::call_duration(json, args),
        command => {
            let app_config = config::load(config_path.clone()).with_context(|| "load config")?;
            match config::resolve_config_path(config_path) {
                Ok(path) if path.exists() => debug!(path = %path.display(), "config resolved"),
                Ok(path) => debug!(path = %path.display(), "config missing, using defaults"),
                Err(err) => debug!(error = %err, "config unavailable"),
            }

            let db_path = paths::resolve_db_path(db_path.as_deref())
                .with_context(|| "resolve database path")?;
            debug!(path = %db_path.display(), "database path resolved");

            let store = Store::open(&db_path)
                .with_context(|| format!("open database {}", db_path.display()))?;
            store.migrate().with_context(|| "run migrations")?;

            let ctx = Context {
                store: &store,
                json,
                config: &app_config,
            };

            match command {
                Command::Import(args) => import::import(&ctx, args),
                Command::Mapping(args) => import::mapping(&ctx, args),
                Command::Runs => import::list_runs(&ctx),
                Command::List(args) => contacts::list_contacts(&ctx, args),
                Command::Show(args) => contacts::show_contact(&ctx, args),
                Command::RecordCall(args) => calls::record_call(&ctx, args),
                Command::Export(cmd) => match cmd {
                    export::ExportCommand::Csv(args) => export::export_csv(&ctx, args),
                },
                Command::Completions(_) | Command::CallDuration(_) => {
                    unreachable!("handled before store initialization")
                }
            }
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
