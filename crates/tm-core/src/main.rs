//! tm-core command line.
//!
//! ```text
//! tm-core ingest [--input FILE] [--save-interval SECS]
//! tm-core inspect [--event NAME] [--summary]
//! tm-core import EVENTS_JSON [--force]
//! tm-core check-config
//! ```

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tm_common::{Error, Result};
use tm_config::{DiscriminatorConfig, Settings};
use tm_core::engine::SchemaMapper;
use tm_core::exit_codes::ExitCode;
use tm_core::ingest::IngestSession;
use tm_core::inspect::{import_document, render_event, render_store, summarize, LegacyDocument};
use tm_core::logging::{init_logging, LogFormat};
use tm_core::persist::DatasetFile;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tm-core", version, about = "Learn JSON schemas of gateway events")]
struct Cli {
    /// Dataset file holding the learned schemas
    #[arg(long, global = true, env = "TM_DATASET")]
    dataset: Option<PathBuf>,

    /// Discriminator config file
    #[arg(long, global = true, env = "TM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read gateway frames and learn schemas from dispatch events
    Ingest(IngestArgs),
    /// Print the learned schemas as JSON
    Inspect(InspectArgs),
    /// Convert an events.json document into a dataset
    Import(ImportArgs),
    /// Validate the discriminator config and print resolved settings
    CheckConfig,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Newline-delimited gateway frames; stdin if omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Seconds between periodic saves (0 disables them)
    #[arg(long, env = "TM_SAVE_INTERVAL_SECS")]
    save_interval: Option<u64>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Only print this event
    #[arg(long)]
    event: Option<String>,

    /// Print per-event counts instead of full schemas
    #[arg(long, conflicts_with = "event")]
    summary: bool,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Path to an events.json document
    events_json: PathBuf,

    /// Overwrite an existing dataset
    #[arg(long)]
    force: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, code = e.code(), "command failed");
            eprintln!("tm-core: {e}");
            if e.is_dataset_error() {
                eprintln!("tm-core: the dataset file was left untouched");
            }
            ExitCode::from(&e)
        }
    };
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> Result<ExitCode> {
    let save_interval = match &cli.command {
        Command::Ingest(args) => args.save_interval,
        _ => None,
    };
    let settings = Settings::resolve(cli.dataset, cli.config, save_interval);

    match cli.command {
        Command::Ingest(args) => cmd_ingest(&settings, args),
        Command::Inspect(args) => cmd_inspect(&settings, args),
        Command::Import(args) => cmd_import(&settings, args),
        Command::CheckConfig => cmd_check_config(&settings),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn cmd_ingest(settings: &Settings, args: IngestArgs) -> Result<ExitCode> {
    let config = DiscriminatorConfig::load(&settings.config_path)?;
    let dataset = DatasetFile::new(&settings.dataset_path);
    let store = dataset.load()?;
    info!(
        dataset = %settings.dataset_path.display(),
        events = store.len(),
        discriminated = config.len(),
        "starting ingestion"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| Error::Io(io::Error::other(e)))?;

    let session = IngestSession::new(
        SchemaMapper::new(store, config),
        dataset,
        settings.save_interval,
    );
    let report = match &args.input {
        Some(path) => session.run(BufReader::new(File::open(path)?), shutdown)?,
        None => session.run(BufReader::new(io::stdin()), shutdown)?,
    };

    print_json(&report)?;
    Ok(if report.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Clean
    })
}

fn cmd_inspect(settings: &Settings, args: InspectArgs) -> Result<ExitCode> {
    let store = DatasetFile::new(&settings.dataset_path).load()?;

    if args.summary {
        print_json(&summarize(&store))?;
    } else if let Some(event) = &args.event {
        let schema = store
            .get(event)
            .ok_or_else(|| Error::InvalidInput(format!("no schema for event {event}")))?;
        print_json(&json!({ event.as_str(): render_event(schema) }))?;
    } else {
        print_json(&render_store(&store))?;
    }
    Ok(ExitCode::Clean)
}

fn cmd_import(settings: &Settings, args: ImportArgs) -> Result<ExitCode> {
    let dataset = DatasetFile::new(&settings.dataset_path);
    if dataset.exists() && !args.force {
        return Err(Error::InvalidInput(format!(
            "dataset {} already exists, pass --force to overwrite",
            settings.dataset_path.display()
        )));
    }

    let config = DiscriminatorConfig::load(&settings.config_path)?;
    let text = std::fs::read_to_string(&args.events_json)?;
    let doc: LegacyDocument = serde_json::from_str(&text)
        .map_err(|e| Error::InvalidInput(format!("{}: {e}", args.events_json.display())))?;
    let store = import_document(&doc, &config)?;
    dataset.save(&store)?;

    info!(
        source = %args.events_json.display(),
        dataset = %settings.dataset_path.display(),
        events = store.len(),
        entries = store.entry_count(),
        "imported events.json"
    );
    print_json(&json!({
        "events": store.len(),
        "entries": store.entry_count(),
        "dataset": settings.dataset_path,
    }))?;
    Ok(ExitCode::Clean)
}

fn cmd_check_config(settings: &Settings) -> Result<ExitCode> {
    let config = DiscriminatorConfig::load(&settings.config_path)?;
    let events: Vec<_> = config
        .events()
        .into_iter()
        .map(|(event, paths)| {
            json!({
                "event": event,
                "paths": paths.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect();

    print_json(&json!({
        "status": "ok",
        "settings": settings,
        "discriminators": events,
    }))?;
    Ok(ExitCode::Clean)
}
