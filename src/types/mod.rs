//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `call_record`: Persisted call records and their stored form
//! - `rejection`: Row-level rejection reasons written to the quarantine artifact
//! - `job`: Import jobs, retry policy, lifecycle events and submission outcomes
//! - `report`: Derived report rows
//! - `error`: Error types for job-level and submission-level failures

pub mod call_record;
pub mod error;
pub mod job;
pub mod rejection;
pub mod report;

pub use call_record::{CallRecord, StoredCallRecord};
pub use error::IngestError;
pub use job::{
    ImportJob, IngestSummary, JobEvent, JobId, JobOutcome, JobState, OutcomeStatus, RetryPolicy,
    SubmissionStatus, UploadFileResult, UploadResponse, UploadSummary,
};
pub use rejection::{FieldViolation, RejectReason, RejectedLine};
pub use report::{DailySummary, HourlyReportRow, SourceSummary};
