//! In-process job queue backed by a pool of worker tasks
//!
//! This module provides the `LocalJobQueue` struct, an implementation of
//! [`JobQueue`] for a single process.
//!
//! # Architecture
//!
//! ```text
//! enqueue ──► mpsc channel ──► worker 1 ──┐
//!                          ├─► worker 2 ──┼──► JobHandler::handle (per attempt)
//!                          └─► worker N ──┘
//!                                  │
//!                                  └──► broadcast::Sender<JobEvent>
//! ```
//!
//! # Guarantees
//!
//! - each job is taken off the channel by exactly one worker, which owns it
//!   until it reaches a terminal state
//! - attempts of one job never overlap; a failed attempt is followed by the
//!   fixed backoff before the next one
//! - distinct jobs run concurrently, up to the number of workers
//! - terminal jobs leave the bookkeeping; nothing is kept for replay
//!
//! # Thread Safety
//!
//! Job states live in a `DashMap` shared by the workers and the queue
//! handle. A panicking attempt is isolated in its own task and counts as a
//! failed attempt.

use super::{JobHandler, JobQueue};
use crate::types::{ImportJob, IngestError, IngestSummary, JobEvent, JobId, JobState, RetryPolicy};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Capacity of the lifecycle event channel
pub const EVENT_CAPACITY: usize = 1024;

/// State shared by all workers
struct Dispatcher {
    handler: Arc<dyn JobHandler>,
    policy: RetryPolicy,
    events: broadcast::Sender<JobEvent>,
    pending: DashMap<JobId, JobState>,
}

impl Dispatcher {
    /// Drive one job from its first attempt to a terminal state
    async fn process(&self, job: ImportJob) {
        let mut attempt = 1;

        let terminal = loop {
            self.transition(&job, JobState::Running { attempt });
            tracing::info!(job_id = %job.id, filename = %job.filename, attempt, "Job started");

            match self.attempt(&job, attempt).await {
                Ok(summary) => {
                    tracing::info!(
                        job_id = %job.id,
                        filename = %job.filename,
                        attempt,
                        total_inserted = summary.total_inserted,
                        rejected = summary.rejected,
                        "Job succeeded"
                    );
                    break JobState::Succeeded(summary);
                }
                Err(error) if self.policy.should_retry(attempt) => {
                    tracing::warn!(
                        job_id = %job.id,
                        filename = %job.filename,
                        attempt,
                        error = %error,
                        backoff_ms = self.policy.backoff.as_millis() as u64,
                        "Job attempt failed, retrying"
                    );
                    self.transition(&job, JobState::Retrying { attempt, error });
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(
                        job_id = %job.id,
                        filename = %job.filename,
                        attempts = attempt,
                        error = %error,
                        "Job permanently failed"
                    );
                    break JobState::PermanentlyFailed {
                        attempts: attempt,
                        error,
                    };
                }
            }
        };

        self.handler.finish(&job, &terminal).await;
        self.pending.remove(&job.id);
        self.publish(&job, terminal);
    }

    /// Run one attempt in its own task so a panic fails only that attempt
    async fn attempt(&self, job: &ImportJob, attempt: u32) -> Result<IngestSummary, IngestError> {
        let handler = Arc::clone(&self.handler);
        let job = job.clone();

        match tokio::spawn(async move { handler.handle(&job, attempt).await }).await {
            Ok(result) => result,
            Err(e) => Err(IngestError::Worker {
                message: e.to_string(),
            }),
        }
    }

    fn transition(&self, job: &ImportJob, state: JobState) {
        self.pending.insert(job.id, state.clone());
        self.publish(job, state);
    }

    fn publish(&self, job: &ImportJob, state: JobState) {
        // No subscribers is not an error
        let _ = self.events.send(JobEvent {
            job_id: job.id,
            filename: job.filename.clone(),
            state,
        });
    }
}

/// In-process job queue
pub struct LocalJobQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<ImportJob>>>,
    dispatcher: Arc<Dispatcher>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl LocalJobQueue {
    /// Start a queue with `workers` worker tasks
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `handler` - Processes each attempt
    /// * `workers` - Number of jobs processed concurrently (at least one)
    /// * `policy` - Attempts per job and delay between them
    pub fn start(handler: Arc<dyn JobHandler>, workers: usize, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let dispatcher = Arc::new(Dispatcher {
            handler,
            policy,
            events,
            pending: DashMap::new(),
        });

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(job) = next else { break };
                        dispatcher.process(job).await;
                    }
                    tracing::debug!(worker, "Worker stopped");
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            dispatcher,
            workers: Mutex::new(handles),
        }
    }

    /// Number of jobs not yet in a terminal state
    pub fn pending_count(&self) -> usize {
        self.dispatcher.pending.len()
    }

    /// Current state of a pending job
    pub fn state(&self, job_id: JobId) -> Option<JobState> {
        self.dispatcher
            .pending
            .get(&job_id)
            .map(|entry| entry.value().clone())
    }

    /// Stop accepting jobs, then wait for queued and running jobs to finish
    pub async fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<ImportJob>> {
        self.sender.lock().ok().and_then(|sender| sender.clone())
    }
}

#[async_trait]
impl JobQueue for LocalJobQueue {
    async fn enqueue(&self, job: ImportJob) -> Result<JobId, IngestError> {
        let sender = self.sender().ok_or(IngestError::QueueClosed)?;
        let job_id = job.id;
        let filename = job.filename.clone();

        self.dispatcher.transition(&job, JobState::Queued);

        if sender.send(job).is_err() {
            self.dispatcher.pending.remove(&job_id);
            return Err(IngestError::QueueClosed);
        }

        tracing::info!(job_id = %job_id, filename = %filename, "Job enqueued");
        Ok(job_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.dispatcher.events.subscribe()
    }

    fn is_pending(&self, job_id: JobId) -> bool {
        self.dispatcher.pending.contains_key(&job_id)
    }
}
