//! File-backed call record store
//!
//! Keeps every record in a [`MemoryStore`] and mirrors it to a JSON-lines
//! file, one [`StoredCallRecord`] per line, so duplicate detection and
//! overwrites work across runs of the binary.
//!
//! # Durability
//!
//! - `insert_many` appends the whole batch with one write before the batch
//!   becomes visible in memory; a failed write leaves both untouched.
//! - `delete_many` rewrites the file through a temporary sibling and a
//!   rename, then applies the delete in memory.
//!
//! Mutations are serialized by one async lock; queries read memory only.

use crate::core::memory::MemoryStore;
use crate::core::traits::{CallRecordStore, RecordFilter};
use crate::types::{CallRecord, IngestError, SourceSummary, StoredCallRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Call record store persisted as JSON lines
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading any records already there
    ///
    /// A missing file is an empty store; the file and its parent directory
    /// are created on the first write.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Store` if the file cannot be read or a line is
    /// not a stored record.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let path = path.into();
        let records = MemoryStore::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let mut stored = Vec::new();
                for (index, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: StoredCallRecord = serde_json::from_str(line).map_err(|e| {
                        IngestError::store(
                            "open",
                            format!("{} line {}: {}", path.display(), index + 1, e),
                        )
                    })?;
                    stored.push(record);
                }

                let loaded = records.insert_stored(stored);
                tracing::debug!(path = %path.display(), loaded, "Loaded record store");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(IngestError::store(
                    "open",
                    format!("{}: {}", path.display(), e),
                ))
            }
        }

        Ok(Self {
            path,
            records,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn ensure_parent(&self, operation: &str) -> Result<(), IngestError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::store(operation, format!("{}: {}", parent.display(), e))),
            _ => Ok(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn encode(stored: &[StoredCallRecord], operation: &str) -> Result<Vec<u8>, IngestError> {
    let mut bytes = Vec::new();
    for record in stored {
        serde_json::to_writer(&mut bytes, record)
            .map_err(|e| IngestError::store(operation, e.to_string()))?;
        bytes.push(b'\n');
    }
    Ok(bytes)
}

#[async_trait]
impl CallRecordStore for FileStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<CallRecord>, IngestError> {
        self.records.find(filter).await
    }

    async fn exists(&self, filter: &RecordFilter) -> Result<bool, IngestError> {
        self.records.exists(filter).await
    }

    async fn insert_many(&self, records: Vec<CallRecord>) -> Result<usize, IngestError> {
        let inserted_at = Utc::now();
        let stored: Vec<StoredCallRecord> = records
            .into_iter()
            .map(|record| StoredCallRecord {
                record,
                inserted_at,
            })
            .collect();
        let bytes = encode(&stored, "insert_many")?;

        let _guard = self.write_lock.lock().await;
        self.ensure_parent("insert_many").await?;

        let write = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(&bytes).await?;
            file.flush().await
        };
        write
            .await
            .map_err(|e| IngestError::store("insert_many", format!("{}: {}", self.path.display(), e)))?;

        Ok(self.records.insert_stored(stored))
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<usize, IngestError> {
        let _guard = self.write_lock.lock().await;

        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .records
            .snapshot()
            .into_iter()
            .partition(|stored| !filter.matches(&stored.record));
        if dropped.is_empty() {
            return Ok(0);
        }

        let bytes = encode(&kept, "delete_many")?;
        let temp = self.temp_path();
        let rewrite = async {
            tokio::fs::write(&temp, &bytes).await?;
            tokio::fs::rename(&temp, &self.path).await
        };
        rewrite
            .await
            .map_err(|e| IngestError::store("delete_many", format!("{}: {}", self.path.display(), e)))?;

        self.records.delete_many(filter).await
    }

    async fn summarize_sources(&self) -> Result<Vec<SourceSummary>, IngestError> {
        self.records.summarize_sources().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, close_reason: i32, source: &str) -> CallRecord {
        CallRecord {
            date: date.to_string(),
            hour: 8,
            time: "083015".to_string(),
            close_reason,
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path().join("records.jsonl")).await.unwrap();

        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("records.jsonl");

        let store = FileStore::open(&path).await.unwrap();
        store
            .insert_many(vec![record("06-07-2025", 0, "a.csv"), record("06-07-2025", 1, "a.csv")])
            .await
            .unwrap();
        store.insert_many(vec![record("07-07-2025", 2, "b.csv")]).await.unwrap();
        let mut before = store.summarize_sources().await.unwrap();
        before.sort_by(|a, b| a.source.cmp(&b.source));
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();

        assert_eq!(reopened.len(), 3);
        assert!(reopened
            .exists(&RecordFilter::by_source("a.csv"))
            .await
            .unwrap());
        let mut after = reopened.summarize_sources().await.unwrap();
        after.sort_by(|a, b| a.source.cmp(&b.source));
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let store = FileStore::open(&path).await.unwrap();
        store
            .insert_many(vec![record("06-07-2025", 0, "a.csv"), record("06-07-2025", 0, "b.csv")])
            .await
            .unwrap();

        let deleted = store.delete_many(&RecordFilter::by_source("a.csv")).await.unwrap();
        assert_eq!(deleted, 1);
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(!reopened
            .exists(&RecordFilter::by_source("a.csv"))
            .await
            .unwrap());
        assert!(!dir.path().join("records.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn test_delete_without_matches_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let store = FileStore::open(&path).await.unwrap();
        store.insert_many(vec![record("06-07-2025", 0, "a.csv")]).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let deleted = store.delete_many(&RecordFilter::by_source("zzz.csv")).await.unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_line_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        std::fs::write(&path, "{\"record\": 42}\n").unwrap();

        let result = FileStore::open(&path).await;

        match result {
            Err(IngestError::Store { operation, message }) => {
                assert_eq!(operation, "open");
                assert!(message.contains("line 1"));
            }
            other => panic!("Expected store error, got {:?}", other.map(|s| s.len())),
        }
    }
}
