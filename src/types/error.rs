//! Error types for call record ingestion
//!
//! Row-level problems are not errors: they are `RejectReason` values that end
//! up in the quarantine artifact. This module covers what is left.
//!
//! # Error Categories
//!
//! - **Job-level errors**: the file cannot be opened or read, a bulk write or
//!   delete fails, the quarantine artifact cannot be written. Fatal to one job
//!   attempt and retried by the queue.
//! - **Submission-level errors**: staging an upload fails or the queue is gone.
//!   Reported back to the submitter, no job is created.
//! - **Configuration and query errors**: invalid settings, report dates not in
//!   `DD-MM-YYYY` form.

use thiserror::Error;

/// Main error type for the ingestion pipeline
///
/// Every variant carries plain strings so the error can be cloned into job
/// lifecycle events and compared in tests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// The uploaded file could not be opened
    ///
    /// Fatal to the job attempt.
    #[error("Failed to open '{path}': {message}")]
    FileOpen {
        /// Path of the temporary upload
        path: String,
        /// Underlying I/O error
        message: String,
    },

    /// I/O error outside of opening the input
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// The line stream failed mid-file
    #[error("Read error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Read {
        /// Line number where reading stopped (if available)
        line: Option<u64>,
        /// Description of the read error
        message: String,
    },

    /// The storage collaborator refused a write, delete or query
    ///
    /// Bulk inserts are all-or-nothing per call, so no partial batch is left behind.
    #[error("Store {operation} failed: {message}")]
    Store {
        /// Operation that failed (insert_many, delete_many, find, ...)
        operation: String,
        /// Description of the failure
        message: String,
    },

    /// The quarantine artifact could not be written
    #[error("Failed to write quarantine artifact '{path}': {message}")]
    Quarantine {
        /// Artifact path
        path: String,
        /// Underlying I/O error
        message: String,
    },

    /// A configuration value is unusable
    #[error("Invalid configuration for {key}: {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// Report date not in strict `DD-MM-YYYY` form
    #[error("Invalid date format: {value}. Expected format: DD-MM-YYYY")]
    InvalidReportDate {
        /// The rejected input
        value: String,
    },

    /// A job handler aborted without returning a result
    #[error("Worker failed: {message}")]
    Worker {
        /// Panic or join failure description
        message: String,
    },

    /// The job queue is no longer accepting work
    #[error("Job queue is closed")]
    QueueClosed,
}

impl From<std::io::Error> for IngestError {
    fn from(error: std::io::Error) -> Self {
        IngestError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for IngestError {
    fn from(error: csv_async::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        IngestError::Read {
            line,
            message: error.to_string(),
        }
    }
}

impl IngestError {
    /// Create a FileOpen error
    pub fn file_open(path: &std::path::Path, error: &std::io::Error) -> Self {
        IngestError::FileOpen {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Create a Store error
    pub fn store(operation: &str, message: impl Into<String>) -> Self {
        IngestError::Store {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Create a Quarantine error
    pub fn quarantine(path: &std::path::Path, error: &std::io::Error) -> Self {
        IngestError::Quarantine {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(key: &str, message: impl Into<String>) -> Self {
        IngestError::InvalidConfig {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Create an InvalidReportDate error
    pub fn invalid_report_date(value: &str) -> Self {
        IngestError::InvalidReportDate {
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::file_open(
        IngestError::FileOpen { path: "uploads/files-1.csv".to_string(), message: "No such file or directory".to_string() },
        "Failed to open 'uploads/files-1.csv': No such file or directory"
    )]
    #[case::io_error(
        IngestError::Io { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::read_error_with_line(
        IngestError::Read { line: Some(42), message: "unexpected EOF".to_string() },
        "Read error at line 42: unexpected EOF"
    )]
    #[case::read_error_without_line(
        IngestError::Read { line: None, message: "unexpected EOF".to_string() },
        "Read error: unexpected EOF"
    )]
    #[case::store(
        IngestError::Store { operation: "insert_many".to_string(), message: "connection reset".to_string() },
        "Store insert_many failed: connection reset"
    )]
    #[case::invalid_config(
        IngestError::InvalidConfig { key: "CALL_INGEST_WORKERS".to_string(), message: "not a number".to_string() },
        "Invalid configuration for CALL_INGEST_WORKERS: not a number"
    )]
    #[case::invalid_report_date(
        IngestError::InvalidReportDate { value: "2025-07-06".to_string() },
        "Invalid date format: 2025-07-06. Expected format: DD-MM-YYYY"
    )]
    #[case::worker(
        IngestError::Worker { message: "task panicked".to_string() },
        "Worker failed: task panicked"
    )]
    #[case::queue_closed(IngestError::QueueClosed, "Job queue is closed")]
    fn test_error_display(#[case] error: IngestError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::store(
        IngestError::store("delete_many", "timeout"),
        IngestError::Store { operation: "delete_many".to_string(), message: "timeout".to_string() }
    )]
    #[case::invalid_config(
        IngestError::invalid_config("batch_size", "must be positive"),
        IngestError::InvalidConfig { key: "batch_size".to_string(), message: "must be positive".to_string() }
    )]
    #[case::invalid_report_date(
        IngestError::invalid_report_date("06/07/2025"),
        IngestError::InvalidReportDate { value: "06/07/2025".to_string() }
    )]
    fn test_helper_functions(#[case] result: IngestError, #[case] expected: IngestError) {
        assert_eq!(result, expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: IngestError = io_error.into();
        assert!(matches!(error, IngestError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_file_open_helper_keeps_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = IngestError::file_open(std::path::Path::new("/tmp/x.csv"), &io_error);
        assert_eq!(error.to_string(), "Failed to open '/tmp/x.csv': gone");
    }
}
