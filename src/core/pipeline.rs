//! Streaming ingestion of one uploaded file
//!
//! This module provides the `IngestionPipeline` struct, which performs one
//! complete attempt at importing a file: every line is parsed, valid records
//! are written through a [`BatchWriter`], rejected lines are streamed to a
//! [`QuarantineSink`], and the temporary file is removed once the pass is
//! complete.
//!
//! # Architecture
//!
//! ```text
//! LineReader ──► parse_line ──┬── Record ───► BatchWriter ──► CallRecordStore
//!                             ├── Rejected ─► QuarantineSink ──► invalid-rows-*.log
//!                             └── Blank (skipped)
//! ```
//!
//! # Failure Semantics
//!
//! A rejected line never fails the attempt. A read, store or quarantine
//! failure aborts it: batches already flushed stay in the store, the partial
//! quarantine artifact is removed and the temporary file is kept so the
//! attempt can be retried.

use crate::core::batch_writer::{BatchWriter, DEFAULT_BATCH_SIZE};
use crate::core::parser::{parse_line, ParsedLine};
use crate::core::traits::CallRecordStore;
use crate::io::{LineReader, QuarantineSink};
use crate::types::{IngestError, IngestSummary, RejectReason, RejectedLine};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Records written and dates seen during one pass
struct PassOutcome {
    inserted: usize,
    dates: BTreeSet<String>,
}

/// One-file ingestion pipeline
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn CallRecordStore>,
    batch_size: usize,
    quarantine_dir: PathBuf,
}

impl IngestionPipeline {
    /// Create a new IngestionPipeline
    ///
    /// # Arguments
    ///
    /// * `store` - Destination of validated records
    /// * `quarantine_dir` - Directory receiving quarantine artifacts
    pub fn new(store: Arc<dyn CallRecordStore>, quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            quarantine_dir: quarantine_dir.into(),
        }
    }

    /// Override the number of records per store call
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Ingest `file_path` as source `filename`
    ///
    /// # Arguments
    ///
    /// * `file_path` - Temporary file owned by the calling job
    /// * `filename` - Logical source name stamped on every record
    ///
    /// # Returns
    ///
    /// An `IngestSummary` with the inserted count, the quarantine artifact
    /// (if any line was rejected) and the distinct dates written.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; see the module documentation for what
    /// is left behind.
    pub async fn run(&self, file_path: &Path, filename: &str) -> Result<IngestSummary, IngestError> {
        tracing::info!(filename, path = %file_path.display(), "Starting import");

        let mut sink = QuarantineSink::new(&self.quarantine_dir);

        let outcome = match self.stream(file_path, filename, &mut sink).await {
            Ok(outcome) => outcome,
            Err(e) => {
                sink.discard().await;
                return Err(e);
            }
        };

        let rejected = sink.count();
        let quarantine_path = sink.finish().await?;

        if let Err(e) = tokio::fs::remove_file(file_path).await {
            tracing::warn!(
                filename,
                path = %file_path.display(),
                error = %e,
                "Failed to remove temporary file"
            );
        }

        if let Some(path) = &quarantine_path {
            tracing::warn!(
                filename,
                rejected,
                quarantine = %path.display(),
                "Rejected lines written to quarantine"
            );
        }
        tracing::info!(
            filename,
            total_inserted = outcome.inserted,
            rejected,
            "Import complete"
        );

        Ok(IngestSummary {
            total_inserted: outcome.inserted,
            rejected,
            quarantine_path,
            dates: outcome.dates,
        })
    }

    async fn stream(
        &self,
        file_path: &Path,
        filename: &str,
        sink: &mut QuarantineSink,
    ) -> Result<PassOutcome, IngestError> {
        let mut reader = LineReader::open(file_path).await?;
        let mut writer = BatchWriter::new(self.store.as_ref(), self.batch_size);
        let mut dates = BTreeSet::new();

        while let Some(line) = reader.next_line().await? {
            let parsed = match line.decode_error {
                Some(message) => ParsedLine::Rejected(RejectReason::Unreadable(message)),
                None => parse_line(&line.text, filename),
            };

            match parsed {
                ParsedLine::Blank => {}
                ParsedLine::Record(record) => {
                    if !dates.contains(&record.date) {
                        dates.insert(record.date.clone());
                    }
                    writer.push(record).await?;
                }
                ParsedLine::Rejected(reason) => {
                    tracing::debug!(filename, line = line.number, %reason, "Rejected line");
                    sink.record(&RejectedLine {
                        line_number: line.number,
                        line: line.text,
                        reason,
                    })
                    .await?;
                }
            }
        }

        let inserted = writer.finish().await?;
        Ok(PassOutcome { inserted, dates })
    }
}
