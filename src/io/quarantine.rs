//! Quarantine artifact for rejected lines
//!
//! Rejected lines are appended to the artifact as they are found, so memory
//! use does not grow with the number of bad rows. The file is only created on
//! the first rejection: a clean input leaves no artifact behind.
//!
//! # Format
//!
//! ```text
//! Reason: Invalid time format
//! Line: 20250706,25:00:00,,,0,
//!
//! Reason: Too few columns
//! Line: 20250706
//! ```

use crate::types::{IngestError, RejectedLine};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

/// Streaming writer for one job's quarantine artifact
#[derive(Debug)]
pub struct QuarantineSink {
    dir: PathBuf,
    artifact: Option<(PathBuf, BufWriter<File>)>,
    count: usize,
}

impl QuarantineSink {
    /// Create a sink writing into `dir`; nothing touches the disk yet
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            artifact: None,
            count: 0,
        }
    }

    /// Number of lines quarantined so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Append one rejected line, creating the artifact on first use
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Quarantine` if the directory or file cannot be
    /// created or written.
    pub async fn record(&mut self, rejected: &RejectedLine) -> Result<(), IngestError> {
        let separator = if self.count > 0 { "\n" } else { "" };
        let entry = format!(
            "{}Reason: {}\nLine: {}\n",
            separator, rejected.reason, rejected.line
        );

        let artifact = match self.artifact.take() {
            Some(artifact) => artifact,
            None => create_artifact(&self.dir).await?,
        };
        let (path, writer) = self.artifact.insert(artifact);

        writer
            .write_all(entry.as_bytes())
            .await
            .map_err(|e| IngestError::quarantine(path, &e))?;

        self.count += 1;
        Ok(())
    }

    /// Flush and close the artifact
    ///
    /// Returns its location, or `None` when nothing was rejected.
    pub async fn finish(self) -> Result<Option<PathBuf>, IngestError> {
        let Some((path, mut writer)) = self.artifact else {
            return Ok(None);
        };

        writer
            .flush()
            .await
            .map_err(|e| IngestError::quarantine(&path, &e))?;

        Ok(Some(path))
    }

    /// Drop a partial artifact after a failed attempt
    pub async fn discard(self) {
        if let Some((path, writer)) = self.artifact {
            drop(writer);
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial quarantine artifact");
            }
        }
    }
}

/// Collision-resistant artifact file name for `now`
pub fn artifact_name(now: DateTime<Utc>) -> String {
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(&[':', '.'][..], "-");
    let suffix = Uuid::new_v4().simple().to_string();

    format!("invalid-rows-{}-{}.log", timestamp, &suffix[..8])
}

async fn create_artifact(dir: &Path) -> Result<(PathBuf, BufWriter<File>), IngestError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| IngestError::quarantine(dir, &e))?;

    let path = dir.join(artifact_name(Utc::now()));
    let file = File::create(&path)
        .await
        .map_err(|e| IngestError::quarantine(&path, &e))?;

    Ok((path, BufWriter::new(file)))
}
