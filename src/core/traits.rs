//! Core traits for the storage and cache collaborators
//!
//! The ingestion core only needs a handful of bulk operations from its
//! document store and a key-value cache with expiry. Both sit behind traits
//! so the in-memory implementations in [`crate::core::memory`] and any real
//! backend can be used interchangeably.

use crate::types::{CallRecord, IngestError, SourceSummary};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// Selection of call records for find and delete operations
///
/// All present criteria must match. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact source filename
    pub source: Option<String>,
    /// Exact `DD-MM-YYYY` day
    pub date: Option<String>,
    /// Calendar day strictly before this one
    ///
    /// Records whose date is not a real calendar day never match.
    pub date_before: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn by_source(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            ..Self::default()
        }
    }

    pub fn by_date(date: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            ..Self::default()
        }
    }

    pub fn older_than(cutoff: NaiveDate) -> Self {
        Self {
            date_before: Some(cutoff),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &CallRecord) -> bool {
        if let Some(source) = &self.source {
            if &record.source != source {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if &record.date != date {
                return false;
            }
        }
        if let Some(cutoff) = self.date_before {
            match record.calendar_date() {
                Some(day) if day < cutoff => {}
                _ => return false,
            }
        }
        true
    }
}

/// Storage collaborator for call records
///
/// Implementations must make `insert_many` all-or-nothing per call: either
/// every record of the batch lands or the call fails. Nothing is required
/// across calls.
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// All records matching the filter
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<CallRecord>, IngestError>;

    /// Whether at least one record matches the filter
    async fn exists(&self, filter: &RecordFilter) -> Result<bool, IngestError>;

    /// Persist a batch; returns the number of records written
    async fn insert_many(&self, records: Vec<CallRecord>) -> Result<usize, IngestError>;

    /// Delete every matching record; returns the number deleted
    async fn delete_many(&self, filter: &RecordFilter) -> Result<usize, IngestError>;

    /// Per-source aggregate, most recently uploaded first
    async fn summarize_sources(&self) -> Result<Vec<SourceSummary>, IngestError>;
}

/// Key-value cache with per-entry time to live
#[async_trait]
pub trait ReportCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);

    async fn invalidate(&self, key: &str);
}
