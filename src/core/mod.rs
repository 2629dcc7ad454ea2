//! Core business logic module
//!
//! This module contains the ingestion components:
//! - `traits` - Storage and cache collaborator abstractions
//! - `parser` - Row parsing and validation
//! - `batch_writer` - Bounded batching into the store
//! - `pipeline` - One complete pass over an uploaded file
//! - `duplicate_guard` - Duplicate detection and filename reservations
//! - `report` - Hourly and daily reports, source listing, retention
//! - `memory` - In-memory store and cache
//! - `file_store` - JSON-lines store persisted across runs

pub mod batch_writer;
pub mod duplicate_guard;
pub mod file_store;
pub mod memory;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod traits;

pub use batch_writer::BatchWriter;
pub use duplicate_guard::{DuplicateGuard, Reservation};
pub use file_store::FileStore;
pub use memory::{MemoryCache, MemoryStore};
pub use parser::{parse_line, ParsedLine};
pub use pipeline::IngestionPipeline;
pub use report::ReportService;
pub use traits::{CallRecordStore, RecordFilter, ReportCache};
