//! Staging of submitted files
//!
//! Every accepted upload is copied into the staging directory under a fresh
//! name. The staged copy belongs to its import job, which deletes it after a
//! complete pass; the caller's original file is never touched.

use crate::types::IngestError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Extension accepted for submitted files (compared case-insensitively)
pub const ACCEPTED_EXTENSION: &str = ".csv";

/// Whether `filename` looks like a call export
pub fn is_csv_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(ACCEPTED_EXTENSION)
}

/// Unique staging name for an upload
pub fn staged_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "files-{}-{}{}",
        Utc::now().timestamp_millis(),
        &suffix[..8],
        ACCEPTED_EXTENSION
    )
}

/// Copy `source` into `staging_dir` and return the staged path
///
/// # Errors
///
/// Returns `IngestError::FileOpen` if the source cannot be read, or
/// `IngestError::Io` if the staging directory cannot be written.
pub async fn stage_upload(source: &Path, staging_dir: &Path) -> Result<PathBuf, IngestError> {
    fs::metadata(source)
        .await
        .map_err(|e| IngestError::file_open(source, &e))?;

    fs::create_dir_all(staging_dir).await?;

    let staged = staging_dir.join(staged_name());
    fs::copy(source, &staged).await?;

    tracing::debug!(
        source = %source.display(),
        staged = %staged.display(),
        "Staged upload"
    );

    Ok(staged)
}
