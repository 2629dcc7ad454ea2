//! In-memory report cache with per-entry expiry

use crate::core::traits::ReportCache;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    /// `None` when the time to live reaches past what `Instant` can hold
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Key-value cache whose entries expire after their time to live
///
/// Expired entries are dropped lazily on lookup.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ReportCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        let value = {
            let entry = self.entries.get(key)?;
            entry.is_live(now).then(|| entry.value.clone())
        };

        if value.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        value
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}
