//! Import job types
//!
//! An `ImportJob` is the queue-resident unit of work "ingest this file". It
//! owns the temporary upload at `file_path` until the job reaches a terminal
//! state. Jobs move through
//! `Queued → Running → {Succeeded | Retrying → Running | PermanentlyFailed}`
//! and every transition is published as a `JobEvent`.

use super::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Queue-assigned job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Payload of one queued import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: JobId,

    /// Temporary on-disk location of the uploaded file
    ///
    /// Removed by the pipeline once a full pass over the file completes.
    pub file_path: PathBuf,

    /// Logical source name; becomes `CallRecord::source`
    pub filename: String,

    pub submitted_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(file_path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            file_path: file_path.into(),
            filename: filename.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Retry policy applied by the queue to failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed delay between two attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt follows a failed `attempt` (1-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Result of one successful pass over a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Records durably written
    pub total_inserted: usize,

    /// Lines sent to quarantine
    pub rejected: usize,

    /// Location of the quarantine artifact, present only if `rejected > 0`
    pub quarantine_path: Option<PathBuf>,

    /// Distinct `DD-MM-YYYY` dates among the inserted records
    pub dates: BTreeSet<String>,
}

/// Lifecycle state of a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Queued,
    Running {
        attempt: u32,
    },
    Retrying {
        attempt: u32,
        error: IngestError,
    },
    Succeeded(IngestSummary),
    PermanentlyFailed {
        attempts: u32,
        error: IngestError,
    },
}

impl JobState {
    /// Succeeded and permanently failed jobs leave the queue
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded(_) | JobState::PermanentlyFailed { .. }
        )
    }
}

/// A state transition published by the queue
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub job_id: JobId,
    pub filename: String,
    pub state: JobState,
}

/// Per-file outcome of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Accepted and enqueued
    Queued,
    /// Duplicate without overwrite; nothing enqueued
    Skipped,
    /// Rejected at submission time
    Error,
}

/// Outcome of submitting one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResult {
    pub file: String,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl UploadFileResult {
    pub fn queued(file: impl Into<String>, job_id: JobId) -> Self {
        Self {
            file: file.into(),
            status: SubmissionStatus::Queued,
            reason: None,
            job_id: Some(job_id),
        }
    }

    pub fn skipped(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: SubmissionStatus::Skipped,
            reason: Some(reason.into()),
            job_id: None,
        }
    }

    pub fn error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: SubmissionStatus::Error,
            reason: Some(reason.into()),
            job_id: None,
        }
    }
}

/// Counts over a batch of submissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub total_files: usize,
    pub queued: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Response to a multi-file submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    pub summary: UploadSummary,
    pub details: Vec<UploadFileResult>,
}

impl UploadResponse {
    pub fn from_results(details: Vec<UploadFileResult>) -> Self {
        let count = |status: SubmissionStatus| details.iter().filter(|r| r.status == status).count();

        let summary = UploadSummary {
            total_files: details.len(),
            queued: count(SubmissionStatus::Queued),
            skipped: count(SubmissionStatus::Skipped),
            errors: count(SubmissionStatus::Error),
        };

        Self { summary, details }
    }

    /// Job ids of the queued files, in submission order
    pub fn queued_jobs(&self) -> Vec<JobId> {
        self.details.iter().filter_map(|r| r.job_id).collect()
    }

    /// One outcome per queued file, in submission order
    ///
    /// A queued job without a terminal event in `events` (e.g. one whose
    /// event was missed by a lagging subscriber) is reported as unknown.
    pub fn outcomes(&self, events: Vec<JobEvent>) -> Vec<JobOutcome> {
        let mut terminal: HashMap<JobId, JobEvent> = events
            .into_iter()
            .filter(|event| event.state.is_terminal())
            .map(|event| (event.job_id, event))
            .collect();

        self.details
            .iter()
            .filter_map(|result| result.job_id.map(|id| (id, result)))
            .map(|(id, result)| match terminal.remove(&id) {
                Some(event) => JobOutcome::from_event(event),
                None => JobOutcome::unknown(id, &result.file),
            })
            .collect()
    }
}

/// How a queued job ended, as far as the submitter knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    /// No terminal event was observed
    Unknown,
}

/// Final state of one queued job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub job_id: JobId,
    pub file: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_inserted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn unknown(job_id: JobId, file: impl Into<String>) -> Self {
        Self {
            job_id,
            file: file.into(),
            status: OutcomeStatus::Unknown,
            total_inserted: None,
            rejected: None,
            quarantine_path: None,
            attempts: None,
            error: None,
        }
    }

    pub fn from_event(event: JobEvent) -> Self {
        let mut outcome = Self::unknown(event.job_id, event.filename);

        match event.state {
            JobState::Succeeded(summary) => {
                outcome.status = OutcomeStatus::Succeeded;
                outcome.total_inserted = Some(summary.total_inserted);
                outcome.rejected = Some(summary.rejected);
                outcome.quarantine_path = summary.quarantine_path;
            }
            JobState::PermanentlyFailed { attempts, error } => {
                outcome.status = OutcomeStatus::Failed;
                outcome.attempts = Some(attempts);
                outcome.error = Some(error.to_string());
            }
            _ => {}
        }
        outcome
    }

    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}
