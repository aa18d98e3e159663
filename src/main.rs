use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Parser;
use tracker_archiver::{
    archive::Archiver,
    config::{self, ArchiverConfig, DocumentConfig},
    observability,
    retention::{RetentionScanner, ScanPolicy, cutoff_for},
    schedule,
    storage::{FilesystemBackup, FilesystemDocumentStore, read_csv_table},
};

const DEFAULT_CONFIG_PATH: &str = "tracker-archiver.toml";

/// CLI arguments for the tracker archiver
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Back up tracking documents and prune rows older than the retention window",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Back up and prune every configured document once (default)
    Run {
        /// Log what would be pruned without backing up or modifying anything
        #[arg(long)]
        dry_run: bool,
        /// Only process these document ids (repeatable)
        #[arg(short, long = "document", value_name = "ID")]
        documents: Vec<String>,
    },
    /// Print which rows of a single CSV sheet fall outside the retention window
    Scan {
        /// CSV file to scan
        file: PathBuf,
        /// 0-based index of the date column
        #[arg(long, default_value = "0")]
        date_column: usize,
        /// Cutoff date (YYYY-MM-DD); defaults to `retention.months` before now
        #[arg(long)]
        cutoff: Option<NaiveDate>,
    },
    /// Run on the configured monthly schedule until interrupted
    Watch,
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to --config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Export the JSON schema for the configuration file
    Schema {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Starting configuration written by `init`.
fn default_config_toml() -> &'static str {
    r#"# Tracker Archiver Configuration

[storage]
# Directory holding one subdirectory per document; sheets are CSV files inside it.
root = "trackers"
# Where backup copies are written.
archive_dir = "trackers-archive"
create_dirs = true

[retention]
# Rows dated more than this many calendar months ago are removed.
months = 3
# Log what would be removed without backing up or changing anything.
dry_run = false
trim_trailing_empty_rows = true

[schedule]
# Used by `tracker-archiver watch`.
day_of_month = 1
hour = 1

[observability.logging]
level = "info"
format = "compact"

[[documents]]
id = "te-tracker-empalme"
description = "TE Tracker Empalme"
sheets = [
    { name = "EXPO", date_column = 0 },
    { name = "IMPO", date_column = 0 },
]
"#
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { output, force }) => {
            run_init(output.unwrap_or(args.config), force);
            ExitCode::SUCCESS
        }
        Some(Command::Schema { output }) => {
            #[cfg(feature = "json-schema")]
            {
                run_schema_export(output);
                ExitCode::SUCCESS
            }
            #[cfg(not(feature = "json-schema"))]
            {
                let _ = output;
                eprintln!("Error: JSON schema export requires the 'json-schema' feature");
                ExitCode::FAILURE
            }
        }
        Some(Command::Scan {
            file,
            date_column,
            cutoff,
        }) => run_scan(&args.config, &file, date_column, cutoff).await,
        Some(Command::Watch) => run_watch(&args.config).await,
        Some(Command::Run { dry_run, documents }) => {
            run_once(&args.config, dry_run, &documents).await
        }
        None => run_once(&args.config, false, &[]).await,
    }
}

/// Load the config file and start logging, or exit with status 1.
fn load_config(path: &Path) -> ArchiverConfig {
    let config = match ArchiverConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    tracing::debug!(config_file = %path.display(), "Configuration loaded");
    config
}

fn build_archiver(config: &ArchiverConfig) -> Archiver {
    let store = FilesystemDocumentStore::from_config(&config.storage);
    let backup = match FilesystemBackup::from_config(&config.storage) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, archive_dir = %config.storage.archive_dir, "Failed to prepare archive directory");
            std::process::exit(1);
        }
    };

    Archiver::new(Arc::new(store), Arc::new(backup), config.retention.clone())
}

/// Resolve `--document` filters against the config. Unknown ids are reported and skipped.
fn select_documents(config: &ArchiverConfig, filter: &[String]) -> Vec<DocumentConfig> {
    if filter.is_empty() {
        return config.documents.clone();
    }

    filter
        .iter()
        .filter_map(|id| {
            let found = config.document(id).cloned();
            if found.is_none() {
                tracing::warn!(document_id = %id, "Document not in configuration, skipping");
            }
            found
        })
        .collect()
}

async fn run_once(config_path: &Path, dry_run: bool, filter: &[String]) -> ExitCode {
    let mut config = load_config(config_path);
    if dry_run {
        config.retention.dry_run = true;
    }

    let documents = select_documents(&config, filter);
    let archiver = build_archiver(&config);
    archiver.run(&documents, Local::now().naive_local()).await;

    // Per-document failures are logged by the run and do not change the exit status.
    ExitCode::SUCCESS
}

async fn run_watch(config_path: &Path) -> ExitCode {
    let config = load_config(config_path);
    let archiver = Arc::new(build_archiver(&config));

    tokio::select! {
        _ = schedule::start_schedule_worker(archiver, config.documents.clone(), config.schedule.clone()) => {},
        _ = shutdown_signal() => {},
    }

    ExitCode::SUCCESS
}

async fn run_scan(
    config_path: &Path,
    file: &Path,
    date_column: usize,
    cutoff: Option<NaiveDate>,
) -> ExitCode {
    // The config is optional here; only its retention settings are used.
    let retention = if config_path.exists() {
        load_config(config_path).retention
    } else {
        config::RetentionConfig::default()
    };

    let cutoff: NaiveDateTime = match cutoff {
        Some(date) => date.and_time(chrono::NaiveTime::MIN),
        None => cutoff_for(Local::now().naive_local(), retention.months),
    };

    let table = match read_csv_table(file).await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to read {}: {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let scanner = RetentionScanner::new(retention.date_parser());
    let result = scanner.scan(&table, &ScanPolicy { date_column, cutoff });

    println!("File:          {}", file.display());
    println!("Rows:          {}", table.len());
    println!("Cutoff:        {}", cutoff.date());
    match result.section_start() {
        Some(row) => println!("First dated:   row {}", row),
        None => println!("First dated:   none"),
    }
    println!("Rows to prune: {}", result.len());
    for row in result.rows() {
        let date = table
            .cell(*row, date_column)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("  {:>6}  {}", row, date);
    }

    ExitCode::SUCCESS
}

/// Create a default configuration file.
fn run_init(output_path: PathBuf, force: bool) {
    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, default_config_toml()) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("To try it without changing anything, run:");
    println!("  tracker-archiver -c {} run --dry-run", output_path.display());
}

/// Export JSON schema for the configuration file to file or stdout
#[cfg(feature = "json-schema")]
fn run_schema_export(output: Option<PathBuf>) {
    let content = config::ArchiverConfig::json_schema_string();

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &content) {
                eprintln!("Failed to write to {}: {}", path.display(), e);
                std::process::exit(1);
            }
            eprintln!("Config JSON schema written to {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping");
}
