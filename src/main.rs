//! Call Record Ingestion CLI
//!
//! Command-line interface for importing call-center CSV exports.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- import calls-0706.csv
//! cargo run -- --store data/records.jsonl import calls-0706.csv
//! cargo run -- --store data/records.jsonl import --overwrite calls-0706.csv
//! cargo run -- import calls-0706.csv --report 06-07-2025 > report.csv
//! cargo run -- --workers 4 --backoff-ms 1000 --log-format json import calls.csv
//! ```
//!
//! The program submits every file, waits until each queued job succeeded or
//! permanently failed, prints the submission response and job outcomes as
//! JSON to stdout, and optionally the hourly report CSV of one day.
//!
//! Without `--store` (or `CALL_INGEST_STORE`) records live only for the run,
//! so duplicate detection and `--overwrite` act on files of earlier runs
//! only when a store file is given.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid configuration, unreadable store, invalid report date,
//!   a job that permanently failed or whose outcome is unknown, output not
//!   writable, etc.)

use call_record_ingest::cli::{self, Command};
use call_record_ingest::core::report::parse_report_date;
use call_record_ingest::core::traits::CallRecordStore;
use call_record_ingest::logging::init_logging;
use call_record_ingest::types::{JobOutcome, UploadResponse};
use call_record_ingest::{FileStore, IngestApp, IngestConfig, IngestError, MemoryCache, MemoryStore};
use serde::Serialize;
use std::io::Write;
use std::process;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct ImportOutput {
    #[serde(flatten)]
    response: UploadResponse,
    jobs: Vec<JobOutcome>,
}

fn main() {
    // Parse command-line arguments using clap
    let args = cli::parse_args();

    if let Err(e) = init_logging(args.log_format) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let config = match IngestConfig::from_env() {
        Ok(config) => args.apply_to(config),
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create tokio runtime");
            process::exit(1);
        }
    };

    match runtime.block_on(run(args.command, config)) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "Import failed");
            process::exit(1);
        }
    }
}

/// Execute a command; `Ok(false)` when some job did not succeed
async fn run(command: Command, config: IngestConfig) -> Result<bool, IngestError> {
    let Command::Import {
        files,
        overwrite,
        report,
    } = command;

    // Fail before importing anything
    if let Some(date) = &report {
        parse_report_date(date)?;
    }

    let store: Arc<dyn CallRecordStore> = match &config.store_path {
        Some(path) => Arc::new(FileStore::open(path).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let app = IngestApp::start(&config, store, Arc::new(MemoryCache::new()));

    let (response, events) = app.coordinator.import(&files, overwrite).await;
    app.shutdown().await;

    let jobs = response.outcomes(events);
    let all_succeeded = jobs.iter().all(JobOutcome::succeeded);

    let stdout = std::io::stdout();
    let mut output = stdout.lock();

    serde_json::to_writer_pretty(&mut output, &ImportOutput { response, jobs })
        .map_err(|e| IngestError::Io {
            message: e.to_string(),
        })?;
    writeln!(output)?;

    if let Some(date) = &report {
        app.reports.export_csv(date, &mut output).await?;
    }

    output.flush()?;
    Ok(all_succeeded)
}
