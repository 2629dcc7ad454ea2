//! Thread-safe in-memory call record store
//!
//! This module provides the `MemoryStore` struct, which keeps call records
//! using concurrent data structures to enable safe multi-threaded access.
//!
//! # Design
//!
//! Records are grouped by `source` in a `DashMap`. Every ingestion job writes
//! a single source, so concurrent jobs for different files lock different
//! shards and proceed in parallel. Within a source, records keep insertion
//! order.
//!
//! # Atomicity
//!
//! `insert_many` appends a whole batch while holding the entry lock of its
//! source, so readers observe either none or all of a batch for that source.

use crate::core::traits::{CallRecordStore, RecordFilter};
use crate::types::{CallRecord, IngestError, SourceSummary, StoredCallRecord};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

/// Thread-safe call record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Records by source filename, in insertion order
    records: DashMap<String, Vec<StoredCallRecord>>,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Total number of stored records across all sources
    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records of one source in insertion order
    pub fn records_for(&self, source: &str) -> Vec<CallRecord> {
        self.records
            .get(source)
            .map(|entry| entry.value().iter().map(|s| s.record.clone()).collect())
            .unwrap_or_default()
    }

    /// Add already stamped records, keeping their insertion time
    ///
    /// Records of one source are appended under a single entry lock.
    pub fn insert_stored(&self, stored: Vec<StoredCallRecord>) -> usize {
        let count = stored.len();

        let mut by_source: Vec<(String, Vec<StoredCallRecord>)> = Vec::new();
        for record in stored {
            match by_source
                .iter_mut()
                .find(|(source, _)| *source == record.record.source)
            {
                Some((_, group)) => group.push(record),
                None => by_source.push((record.record.source.clone(), vec![record])),
            }
        }

        for (source, group) in by_source {
            self.records.entry(source).or_default().extend(group);
        }

        count
    }

    /// Every stored record, grouped by source
    pub fn snapshot(&self) -> Vec<StoredCallRecord> {
        self.records
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl CallRecordStore for MemoryStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<CallRecord>, IngestError> {
        let collect = |stored: &[StoredCallRecord]| -> Vec<CallRecord> {
            stored
                .iter()
                .filter(|s| filter.matches(&s.record))
                .map(|s| s.record.clone())
                .collect()
        };

        // A source filter narrows the scan to one entry
        if let Some(source) = &filter.source {
            return Ok(self
                .records
                .get(source)
                .map(|entry| collect(entry.value()))
                .unwrap_or_default());
        }

        Ok(self
            .records
            .iter()
            .flat_map(|entry| collect(entry.value()))
            .collect())
    }

    async fn exists(&self, filter: &RecordFilter) -> Result<bool, IngestError> {
        if let Some(source) = &filter.source {
            return Ok(self.records.get(source).is_some_and(|entry| {
                entry.value().iter().any(|s| filter.matches(&s.record))
            }));
        }

        Ok(self
            .records
            .iter()
            .any(|entry| entry.value().iter().any(|s| filter.matches(&s.record))))
    }

    async fn insert_many(&self, records: Vec<CallRecord>) -> Result<usize, IngestError> {
        let inserted_at = Utc::now();
        let stored = records
            .into_iter()
            .map(|record| StoredCallRecord {
                record,
                inserted_at,
            })
            .collect();

        Ok(self.insert_stored(stored))
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<usize, IngestError> {
        let mut deleted = 0;

        self.records.retain(|source, stored| {
            if filter.source.as_ref().is_some_and(|s| s != source) {
                return true;
            }
            let before = stored.len();
            stored.retain(|s| !filter.matches(&s.record));
            deleted += before - stored.len();
            !stored.is_empty()
        });

        Ok(deleted)
    }

    async fn summarize_sources(&self) -> Result<Vec<SourceSummary>, IngestError> {
        let mut summaries: Vec<SourceSummary> = self
            .records
            .iter()
            .filter_map(|entry| {
                let stored = entry.value();
                let uploaded_at = stored.iter().map(|s| s.inserted_at).min()?;

                let mut days: Vec<_> = stored
                    .iter()
                    .filter_map(|s| s.record.calendar_date().map(|d| (d, &s.record.date)))
                    .collect();
                days.sort_by_key(|(day, _)| *day);

                Some(SourceSummary {
                    source: entry.key().clone(),
                    count: stored.len(),
                    first_date: days.first().map(|(_, date)| (*date).clone()),
                    last_date: days.last().map(|(_, date)| (*date).clone()),
                    uploaded_at,
                })
            })
            .collect();

        summaries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(summaries)
    }
}
