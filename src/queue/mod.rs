//! Job queue and import coordination
//!
//! The submission side and the processing side only meet through a
//! [`JobQueue`]. Submitters enqueue [`ImportJob`]s; the queue hands each job
//! to a [`JobHandler`] one attempt at a time, applies the retry policy and
//! publishes every state transition as a [`JobEvent`].
//!
//! # Components
//!
//! - `local_queue` - In-process queue backed by a worker pool
//! - `worker` - Handler running the ingestion pipeline for one job
//! - `coordinator` - Submission front door with duplicate protection

use crate::types::{ImportJob, IngestError, IngestSummary, JobEvent, JobId, JobState};
use async_trait::async_trait;
use tokio::sync::broadcast;

pub mod coordinator;
pub mod local_queue;
pub mod worker;

pub use coordinator::ImportCoordinator;
pub use local_queue::LocalJobQueue;
pub use worker::IngestionWorker;

/// Processing side of the queue
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt of `job`; `attempt` starts at 1
    ///
    /// An `Err` is a job-level failure and is retried per policy.
    async fn handle(&self, job: &ImportJob, attempt: u32) -> Result<IngestSummary, IngestError>;

    /// Called once with the terminal state, before it is published
    async fn finish(&self, _job: &ImportJob, _state: &JobState) {}
}

/// Queue collaborator connecting submitters and handlers
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Accept a job for processing
    ///
    /// # Errors
    ///
    /// `IngestError::QueueClosed` once the queue stopped accepting work.
    async fn enqueue(&self, job: ImportJob) -> Result<JobId, IngestError>;

    /// Receive every state transition published after this call
    fn subscribe(&self) -> broadcast::Receiver<JobEvent>;

    /// Whether the job is still queued, running or waiting for a retry
    fn is_pending(&self, job_id: JobId) -> bool;
}
