//! Submission front door
//!
//! This module provides the `ImportCoordinator` struct, which turns uploaded
//! files into queued import jobs.
//!
//! # Submission Flow
//!
//! ```text
//! file ─► .csv check ─► stage copy ─► DuplicateGuard::reserve ─► JobQueue::enqueue
//!            │              │                  │
//!          error          error        skipped (queued / uploaded)
//! ```
//!
//! Every file gets exactly one [`UploadFileResult`]. A staged copy that does
//! not end up in a job is removed right away.

use super::JobQueue;
use crate::core::duplicate_guard::{DuplicateGuard, Reservation};
use crate::io::{is_csv_filename, stage_upload};
use crate::types::{ImportJob, JobEvent, JobId, UploadFileResult, UploadResponse};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

/// Reason given for files without a `.csv` extension
pub const ONLY_CSV_MESSAGE: &str = "Only CSV files are allowed!";

/// Entry point for import submissions
pub struct ImportCoordinator {
    queue: Arc<dyn JobQueue>,
    guard: Arc<DuplicateGuard>,
    staging_dir: PathBuf,
}

impl ImportCoordinator {
    pub fn new(queue: Arc<dyn JobQueue>, guard: Arc<DuplicateGuard>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue,
            guard,
            staging_dir: staging_dir.into(),
        }
    }

    /// Lifecycle events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.queue.subscribe()
    }

    /// Submit an already staged file as source `filename`
    ///
    /// # Arguments
    ///
    /// * `file_path` - Staged copy; handed over to the job when queued
    /// * `filename` - Logical source name
    /// * `overwrite` - Replace the rows of an already ingested source
    ///
    /// # Returns
    ///
    /// `queued` with the job id, `skipped` for a duplicate, or `error` when
    /// the store or the queue failed. Only a queued job keeps `file_path`.
    pub async fn submit(&self, file_path: &Path, filename: &str, overwrite: bool) -> UploadFileResult {
        let reservation = match self.guard.reserve(filename, overwrite).await {
            Ok(reservation) => reservation,
            Err(e) => {
                tracing::error!(filename, error = %e, "Duplicate check failed");
                discard_staged(file_path).await;
                return UploadFileResult::error(filename, e.to_string());
            }
        };

        if let Some(reason) = reservation.skip_reason() {
            tracing::info!(filename, reason, "Submission skipped");
            discard_staged(file_path).await;
            return UploadFileResult::skipped(filename, reason);
        }

        if let Reservation::Granted { purged } = reservation {
            if purged > 0 {
                tracing::info!(filename, purged, "Overwriting existing source");
            }
        }

        match self.queue.enqueue(ImportJob::new(file_path, filename)).await {
            Ok(job_id) => UploadFileResult::queued(filename, job_id),
            Err(e) => {
                self.guard.release(filename);
                discard_staged(file_path).await;
                UploadFileResult::error(filename, e.to_string())
            }
        }
    }

    /// Validate, stage and submit each file in order
    pub async fn submit_many(&self, files: &[PathBuf], overwrite: bool) -> UploadResponse {
        let mut results = Vec::with_capacity(files.len());

        for path in files {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            if !is_csv_filename(&filename) {
                tracing::warn!(filename = %filename, "Rejected non-CSV upload");
                results.push(UploadFileResult::error(&filename, ONLY_CSV_MESSAGE));
                continue;
            }

            let staged = match stage_upload(path, &self.staging_dir).await {
                Ok(staged) => staged,
                Err(e) => {
                    tracing::error!(filename = %filename, error = %e, "Failed to stage upload");
                    results.push(UploadFileResult::error(&filename, e.to_string()));
                    continue;
                }
            };

            results.push(self.submit(&staged, &filename, overwrite).await);
        }

        UploadResponse::from_results(results)
    }

    /// Wait until every job in `job_ids` reached a terminal state
    ///
    /// `events` must have been subscribed before the jobs were submitted.
    /// Returns the terminal events in completion order.
    pub async fn wait_for(
        &self,
        mut events: broadcast::Receiver<JobEvent>,
        job_ids: &[JobId],
    ) -> Vec<JobEvent> {
        let mut remaining: HashSet<JobId> = job_ids.iter().copied().collect();
        let mut outcomes = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            match events.recv().await {
                Ok(event) => {
                    if event.state.is_terminal() && remaining.remove(&event.job_id) {
                        outcomes.push(event);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Missed job events, checking queue state");
                    remaining.retain(|id| self.queue.is_pending(*id));
                }
                Err(RecvError::Closed) => break,
            }
        }

        outcomes
    }

    /// Submit `files` and wait for all of their jobs to finish
    pub async fn import(&self, files: &[PathBuf], overwrite: bool) -> (UploadResponse, Vec<JobEvent>) {
        let events = self.subscribe();
        let response = self.submit_many(files, overwrite).await;
        let outcomes = self.wait_for(events, &response.queued_jobs()).await;

        (response, outcomes)
    }
}

async fn discard_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file");
    }
}
