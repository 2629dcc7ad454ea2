//! Job handler running the ingestion pipeline
//!
//! One attempt of an import job:
//! 1. from the second attempt on, purge rows an earlier attempt flushed
//! 2. run the [`IngestionPipeline`] over the staged file
//! 3. invalidate cached reports of every date the file touched
//!
//! When the job reaches a terminal state its filename reservation is
//! released so the file can be submitted again. A permanently failed job
//! first loses every row its attempts flushed, so a resubmission starts
//! from an empty source.

use super::JobHandler;
use crate::core::duplicate_guard::DuplicateGuard;
use crate::core::pipeline::IngestionPipeline;
use crate::core::report::ReportService;
use crate::types::{ImportJob, IngestError, IngestSummary, JobState};
use async_trait::async_trait;
use std::sync::Arc;

/// Ingestion job handler
#[derive(Clone)]
pub struct IngestionWorker {
    pipeline: IngestionPipeline,
    guard: Arc<DuplicateGuard>,
    reports: ReportService,
}

impl IngestionWorker {
    pub fn new(pipeline: IngestionPipeline, guard: Arc<DuplicateGuard>, reports: ReportService) -> Self {
        Self {
            pipeline,
            guard,
            reports,
        }
    }
}

#[async_trait]
impl JobHandler for IngestionWorker {
    async fn handle(&self, job: &ImportJob, attempt: u32) -> Result<IngestSummary, IngestError> {
        if attempt > 1 {
            let purged = self.guard.purge(&job.filename).await?;
            tracing::debug!(
                job_id = %job.id,
                filename = %job.filename,
                attempt,
                purged,
                "Cleared rows of failed attempt"
            );
        }

        let summary = self.pipeline.run(&job.file_path, &job.filename).await?;
        self.reports.invalidate_dates(&summary.dates).await;

        Ok(summary)
    }

    async fn finish(&self, job: &ImportJob, state: &JobState) {
        // Purge while still reserved so no resubmission sees partial rows
        if let JobState::PermanentlyFailed { .. } = state {
            match self.guard.purge(&job.filename).await {
                Ok(purged) => tracing::debug!(
                    job_id = %job.id,
                    filename = %job.filename,
                    purged,
                    "Cleared rows of failed job"
                ),
                Err(e) => tracing::error!(
                    job_id = %job.id,
                    filename = %job.filename,
                    error = %e,
                    "Failed to clear rows of failed job"
                ),
            }

            tracing::warn!(
                job_id = %job.id,
                filename = %job.filename,
                path = %job.file_path.display(),
                "Temporary file left in place after permanent failure"
            );
        }

        self.guard.release(&job.filename);
    }
}
