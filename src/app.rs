//! Wiring of the ingestion service
//!
//! Builds the component graph for a configuration and a pair of storage
//! collaborators:
//!
//! ```text
//! IngestApp
//!     ├── ImportCoordinator ──► LocalJobQueue ──► IngestionWorker
//!     │                                              ├── IngestionPipeline
//!     │                                              └── ReportService (invalidation)
//!     ├── DuplicateGuard (shared by coordinator and worker)
//!     └── ReportService
//! ```

use crate::config::IngestConfig;
use crate::core::duplicate_guard::DuplicateGuard;
use crate::core::pipeline::IngestionPipeline;
use crate::core::report::ReportService;
use crate::core::traits::{CallRecordStore, ReportCache};
use crate::queue::{ImportCoordinator, IngestionWorker, LocalJobQueue};
use std::sync::Arc;

/// A running ingestion service
pub struct IngestApp {
    pub coordinator: ImportCoordinator,
    pub reports: ReportService,
    queue: Arc<LocalJobQueue>,
}

impl IngestApp {
    /// Build the component graph and start the worker pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &IngestConfig,
        store: Arc<dyn CallRecordStore>,
        cache: Arc<dyn ReportCache>,
    ) -> Self {
        let guard = Arc::new(DuplicateGuard::new(Arc::clone(&store)));
        let pipeline = IngestionPipeline::new(Arc::clone(&store), &config.quarantine_dir)
            .with_batch_size(config.batch_size);
        let reports = ReportService::new(store, cache).with_ttl(config.report_ttl);

        let worker = IngestionWorker::new(pipeline, Arc::clone(&guard), reports.clone());
        let queue = Arc::new(LocalJobQueue::start(
            Arc::new(worker),
            config.workers,
            config.retry_policy(),
        ));

        let coordinator = ImportCoordinator::new(queue.clone(), guard, &config.staging_dir);

        tracing::debug!(
            workers = config.workers,
            batch_size = config.batch_size,
            max_attempts = config.max_attempts,
            "Ingestion service started"
        );

        Self {
            coordinator,
            reports,
            queue,
        }
    }

    /// Stop accepting jobs and wait for running ones
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
