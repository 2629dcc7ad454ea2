//! Ingestion configuration
//!
//! Values are layered: built-in defaults, then `CALL_INGEST_*` environment
//! variables (a `.env` file is loaded first when present), then command-line
//! flags applied by the binary.

use crate::types::{IngestError, RetryPolicy};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BATCH_SIZE: &str = "CALL_INGEST_BATCH_SIZE";
pub const ENV_MAX_ATTEMPTS: &str = "CALL_INGEST_MAX_ATTEMPTS";
pub const ENV_BACKOFF_MS: &str = "CALL_INGEST_BACKOFF_MS";
pub const ENV_WORKERS: &str = "CALL_INGEST_WORKERS";
pub const ENV_QUARANTINE_DIR: &str = "CALL_INGEST_QUARANTINE_DIR";
pub const ENV_STAGING_DIR: &str = "CALL_INGEST_STAGING_DIR";
pub const ENV_REPORT_TTL_SECS: &str = "CALL_INGEST_REPORT_TTL_SECS";
pub const ENV_STORE_PATH: &str = "CALL_INGEST_STORE";

/// Configuration of the ingestion service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Records per store call
    pub batch_size: usize,
    /// Attempts per job, including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
    /// Jobs processed concurrently
    pub workers: usize,
    /// Directory receiving quarantine artifacts
    pub quarantine_dir: PathBuf,
    /// Directory receiving staged uploads
    pub staging_dir: PathBuf,
    /// Time to live of cached reports
    pub report_ttl: Duration,
    /// JSON-lines record store; records live in memory only when unset
    pub store_path: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_attempts: 3,
            backoff: Duration::from_secs(5),
            workers: num_cpus::get(),
            quarantine_dir: PathBuf::from("uploads").join("logs"),
            staging_dir: PathBuf::from("uploads"),
            report_ttl: Duration::from_secs(600),
            store_path: None,
        }
    }
}

impl IngestConfig {
    /// Defaults overridden by the process environment
    ///
    /// Loads `.env` from the working directory if there is one.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidConfig` for a variable that is set but
    /// not a number.
    pub fn from_env() -> Result<Self, IngestError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = parse_var::<usize>(&lookup, ENV_BATCH_SIZE)? {
            config.batch_size = value;
        }
        if let Some(value) = parse_var::<u32>(&lookup, ENV_MAX_ATTEMPTS)? {
            config.max_attempts = value;
        }
        if let Some(value) = parse_var::<u64>(&lookup, ENV_BACKOFF_MS)? {
            config.backoff = Duration::from_millis(value);
        }
        if let Some(value) = parse_var::<usize>(&lookup, ENV_WORKERS)? {
            config.workers = value;
        }
        if let Some(value) = lookup(ENV_QUARANTINE_DIR).filter(|v| !v.trim().is_empty()) {
            config.quarantine_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_STAGING_DIR).filter(|v| !v.trim().is_empty()) {
            config.staging_dir = PathBuf::from(value);
        }
        if let Some(value) = parse_var::<u64>(&lookup, ENV_REPORT_TTL_SECS)? {
            config.report_ttl = Duration::from_secs(value);
        }
        if let Some(value) = lookup(ENV_STORE_PATH).filter(|v| !v.trim().is_empty()) {
            config.store_path = Some(PathBuf::from(value));
        }

        Ok(config.normalized())
    }

    /// Replace zero counts with their defaults
    ///
    /// A zero backoff is legal and kept.
    pub fn normalized(self) -> Self {
        let default = Self::default();

        let batch_size = if self.batch_size == 0 {
            tracing::warn!(
                "Invalid batch_size ({}), using default ({})",
                self.batch_size,
                default.batch_size
            );
            default.batch_size
        } else {
            self.batch_size
        };

        let max_attempts = if self.max_attempts == 0 {
            tracing::warn!(
                "Invalid max_attempts ({}), using default ({})",
                self.max_attempts,
                default.max_attempts
            );
            default.max_attempts
        } else {
            self.max_attempts
        };

        let workers = if self.workers == 0 {
            tracing::warn!(
                "Invalid workers ({}), using default ({})",
                self.workers,
                default.workers
            );
            default.workers
        } else {
            self.workers
        };

        Self {
            batch_size,
            max_attempts,
            workers,
            ..self
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, IngestError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| IngestError::invalid_config(key, format!("'{}': {}", raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();

        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, Duration::from_secs(5));
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.quarantine_dir, PathBuf::from("uploads/logs"));
        assert_eq!(config.report_ttl, Duration::from_secs(600));
        assert_eq!(config.store_path, None);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = IngestConfig::from_lookup(lookup_from(&[
            (ENV_BATCH_SIZE, "250"),
            (ENV_MAX_ATTEMPTS, "5"),
            (ENV_BACKOFF_MS, "10"),
            (ENV_WORKERS, "2"),
            (ENV_QUARANTINE_DIR, "/tmp/q"),
            (ENV_STAGING_DIR, "/tmp/s"),
            (ENV_REPORT_TTL_SECS, "30"),
            (ENV_STORE_PATH, "/tmp/records.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.batch_size, 250);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff, Duration::from_millis(10));
        assert_eq!(config.workers, 2);
        assert_eq!(config.quarantine_dir, PathBuf::from("/tmp/q"));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/s"));
        assert_eq!(config.report_ttl, Duration::from_secs(30));
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/records.jsonl")));
    }

    #[rstest]
    #[case::zero_batch_size(ENV_BATCH_SIZE)]
    #[case::zero_attempts(ENV_MAX_ATTEMPTS)]
    #[case::zero_workers(ENV_WORKERS)]
    fn test_zero_counts_fall_back_to_defaults(#[case] key: &str) {
        let config = IngestConfig::from_lookup(lookup_from(&[(key, "0")])).unwrap();
        assert_eq!(config, IngestConfig::default());
    }

    #[test]
    fn test_zero_backoff_is_kept() {
        let config = IngestConfig::from_lookup(lookup_from(&[(ENV_BACKOFF_MS, "0")])).unwrap();
        assert_eq!(config.backoff, Duration::ZERO);
    }

    #[rstest]
    #[case::negative(ENV_BATCH_SIZE, "-1")]
    #[case::text(ENV_MAX_ATTEMPTS, "three")]
    #[case::fraction(ENV_BACKOFF_MS, "1.5")]
    fn test_malformed_values_are_errors(#[case] key: &str, #[case] value: &str) {
        let result = IngestConfig::from_lookup(lookup_from(&[(key, value)]));
        assert!(matches!(result, Err(IngestError::InvalidConfig { .. })));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = IngestConfig::from_lookup(lookup_from(&[
            (ENV_BATCH_SIZE, "  "),
            (ENV_STAGING_DIR, ""),
        ]))
        .unwrap();
        assert_eq!(config, IngestConfig::default());
    }
}
