//! Call Record Ingestion Library
//! # Overview
//!
//! This library ingests call-center CSV exports into a record store: files
//! are streamed line by line, valid rows are written in bounded batches and
//! rejected rows are collected in a quarantine artifact. Imports run as
//! queued background jobs with fixed-delay retries and duplicate protection.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (CallRecord, ImportJob, RejectReason, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`config`] - Layered configuration (defaults, environment, flags)
//! - [`core`] - Business logic components:
//!   - [`core::parser`] - Row parsing and validation
//!   - [`core::batch_writer`] - Bounded batching into the store
//!   - [`core::pipeline`] - One complete pass over an uploaded file
//!   - [`core::duplicate_guard`] - Duplicate detection and reservations
//!   - [`core::report`] - Hourly and daily reports
//!   - [`core::file_store`] - Record store persisted as JSON lines
//! - [`io`] - Line reading, quarantine artifacts, staging, report CSV
//! - [`queue`] - Job queue, ingestion worker and submission front door
//!
//! # Input Lines
//!
//! ```text
//! 20250706,083015,<...>,0,<last>
//! ```
//!
//! - first field: date as `YYYYMMDD`, stored as `DD-MM-YYYY`
//! - second field: time as `HHMMSS` or `HH:MM:SS`; the hour is kept
//! - second-to-last field: close reason code
//!
//! # Close Reasons
//!
//! - `0`: terminal equipment busy
//! - `1`: system busy
//! - `2..=10`: other reasons

// Module declarations
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod queue;
pub mod types;

pub use app::IngestApp;
pub use config::IngestConfig;
pub use core::{FileStore, IngestionPipeline, MemoryCache, MemoryStore, ReportService};
pub use io::write_report_csv;
pub use queue::ImportCoordinator;
pub use types::{
    CallRecord, ImportJob, IngestError, IngestSummary, JobEvent, JobState, RejectReason,
    UploadFileResult, UploadResponse,
};
