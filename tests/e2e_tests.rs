//! End-to-end integration tests
//!
//! These tests validate the complete ingestion flow using predefined CSV
//! test fixtures. Each fixture test:
//! 1. Submits input.csv from a fixture directory through the coordinator
//! 2. Waits for the queued job to finish
//! 3. Exports the hourly report of the fixture's day
//! 4. Compares the report with expected.csv
//! 5. Compares the quarantine artifact with quarantine.log, when present
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - A clean single-day export
//! - Malformed lines mixed with valid ones
//! - CRLF terminators and `HH:MM:SS` times
//! - An export spanning two days
//!
//! The remaining tests cover duplicate submissions, overwrites and upload
//! filtering across the whole service.

#[cfg(test)]
mod tests {
    use call_record_ingest::types::{SubmissionStatus, UploadResponse};
    use call_record_ingest::{
        FileStore, IngestApp, IngestConfig, JobEvent, JobState, MemoryCache, MemoryStore,
    };
    use rstest::rstest;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> IngestConfig {
        IngestConfig {
            batch_size: 2,
            max_attempts: 3,
            backoff: Duration::from_millis(10),
            workers: 2,
            quarantine_dir: dir.join("logs"),
            staging_dir: dir.join("uploads"),
            report_ttl: Duration::from_secs(600),
            store_path: None,
        }
    }

    fn start(dir: &TempDir) -> IngestApp {
        IngestApp::start(
            &test_config(dir.path()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
        )
    }

    /// Write `content` as `<dir>/<name>` and return the path
    fn write_upload(dir: &Path, name: &str, content: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    async fn export(app: &IngestApp, date: &str) -> String {
        let mut output = Vec::new();
        app.reports
            .export_csv(date, &mut output)
            .await
            .unwrap_or_else(|e| panic!("Failed to export report for {}: {}", date, e));
        String::from_utf8(output).unwrap()
    }

    fn single_success(response: &UploadResponse, events: &[JobEvent]) -> (usize, usize, Option<PathBuf>) {
        assert_eq!(response.summary.queued, 1, "details: {:?}", response.details);
        assert_eq!(events.len(), 1);

        match &events[0].state {
            JobState::Succeeded(summary) => (
                summary.total_inserted,
                summary.rejected,
                summary.quarantine_path.clone(),
            ),
            other => panic!("Expected job to succeed, got {:?}", other),
        }
    }

    /// Run a test fixture by importing input.csv and comparing the report with expected.csv
    ///
    /// # Arguments
    ///
    /// * `fixture_name` - Name of the fixture directory (e.g., "basic_day")
    /// * `date` - Day to export, `DD-MM-YYYY`
    /// * `expected_inserted` - Records the job should report as written
    /// * `expected_rejected` - Lines the job should report as quarantined
    ///
    /// # Panics
    ///
    /// Panics if fixture files cannot be read or any output does not match.
    async fn run_test_fixture(
        fixture_name: &str,
        date: &str,
        expected_inserted: usize,
        expected_rejected: usize,
    ) {
        let fixture_dir = Path::new("tests/fixtures").join(fixture_name);
        let input_path = fixture_dir.join("input.csv");
        let expected_path = fixture_dir.join("expected.csv");
        let quarantine_path = fixture_dir.join("quarantine.log");

        assert!(input_path.exists(), "Input file not found: {}", input_path.display());
        assert!(
            expected_path.exists(),
            "Expected file not found: {}",
            expected_path.display()
        );

        let dir = tempfile::tempdir().unwrap();
        let app = start(&dir);

        let (response, events) = app.coordinator.import(&[input_path.clone()], false).await;
        let (inserted, rejected, artifact) = single_success(&response, &events);

        assert_eq!(inserted, expected_inserted, "inserted count for {}", fixture_name);
        assert_eq!(rejected, expected_rejected, "rejected count for {}", fixture_name);

        // The fixture itself is never consumed, only its staged copy
        assert!(input_path.exists());

        let actual_output = export(&app, date).await;
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path.display(), e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {}\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, actual_output, expected_output
        );

        match (artifact, quarantine_path.exists()) {
            (Some(artifact), true) => {
                let actual = fs::read_to_string(&artifact).unwrap();
                let expected = fs::read_to_string(&quarantine_path).unwrap();
                assert_eq!(actual, expected, "Quarantine mismatch for fixture: {}", fixture_name);
            }
            (None, false) => {}
            (artifact, expected) => panic!(
                "Quarantine presence mismatch for {}: artifact {:?}, expected {}",
                fixture_name, artifact, expected
            ),
        }

        app.shutdown().await;
    }

    /// End-to-end test for all fixtures
    #[rstest]
    #[case("basic_day", "06-07-2025", 7, 0)]
    #[case("mixed_invalid", "06-07-2025", 4, 6)]
    #[case("crlf_colon_times", "07-07-2025", 5, 0)]
    #[case("two_days", "06-07-2025", 4, 0)]
    #[tokio::test]
    async fn test_fixtures(
        #[case] fixture: &str,
        #[case] date: &str,
        #[case] inserted: usize,
        #[case] rejected: usize,
    ) {
        run_test_fixture(fixture, date, inserted, rejected).await;
    }

    #[tokio::test]
    async fn test_second_submission_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let app = start(&dir);
        let upload = write_upload(&dir.path().join("in"), "calls.csv", "20250706,080000,a,0,b\n");

        let (first, _) = app.coordinator.import(&[upload.clone()], false).await;
        assert_eq!(first.summary.queued, 1);

        let (second, events) = app.coordinator.import(&[upload], false).await;
        assert_eq!(second.summary.skipped, 1);
        assert_eq!(second.details[0].reason.as_deref(), Some("Already uploaded"));
        assert!(events.is_empty());

        let sources = app.reports.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "calls.csv");
        assert_eq!(sources[0].count, 1);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_overwrite_replaces_rows_and_refreshes_report() {
        let dir = tempfile::tempdir().unwrap();
        let app = start(&dir);

        let original = write_upload(
            &dir.path().join("monday"),
            "calls.csv",
            "20250706,080000,a,0,b\n20250706,081000,a,0,b\n",
        );
        let (_, events) = app.coordinator.import(&[original], false).await;
        assert!(matches!(events[0].state, JobState::Succeeded(_)));

        // Warm the cache with the original rows
        let summary = app.reports.daily_summary("06-07-2025").await.unwrap();
        assert_eq!(summary.qty, 2);
        assert_eq!(summary.te_busy, 2);

        let replacement = write_upload(
            &dir.path().join("tuesday"),
            "calls.csv",
            "20250706,090000,a,1,b\n",
        );
        let (response, events) = app.coordinator.import(&[replacement], true).await;
        assert_eq!(response.summary.queued, 1);
        assert!(matches!(events[0].state, JobState::Succeeded(_)));

        let summary = app.reports.daily_summary("06-07-2025").await.unwrap();
        assert_eq!(summary.qty, 1);
        assert_eq!(summary.te_busy, 0);
        assert_eq!(summary.sys_busy, 1);
        assert_eq!(summary.sys_busy_percent, "100.00%");

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_mixed_batch_of_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let app = start(&dir);
        let uploads = dir.path().join("in");

        let files = vec![
            write_upload(&uploads, "first.csv", "20250706,080000,a,0,b\n"),
            write_upload(&uploads, "notes.txt", "20250706,080000,a,0,b\n"),
            write_upload(&uploads, "SECOND.CSV", "20250706,090000,a,2,b\n"),
            uploads.join("missing.csv"),
        ];

        let (response, events) = app.coordinator.import(&files, false).await;

        assert_eq!(response.summary.total_files, 4);
        assert_eq!(response.summary.queued, 2);
        assert_eq!(response.summary.errors, 2);
        assert_eq!(response.details[1].status, SubmissionStatus::Error);
        assert_eq!(
            response.details[1].reason.as_deref(),
            Some("Only CSV files are allowed!")
        );
        assert_eq!(response.details[3].status, SubmissionStatus::Error);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e.state, JobState::Succeeded(_))));

        let summary = app.reports.daily_summary("06-07-2025").await.unwrap();
        assert_eq!(summary.qty, 2);
        assert_eq!(summary.others, 1);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_staged_copies_are_removed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = start(&dir);
        let upload = write_upload(&dir.path().join("in"), "calls.csv", "20250706,080000,a,0,b\n");

        let (_, events) = app.coordinator.import(&[upload], false).await;
        assert!(matches!(events[0].state, JobState::Succeeded(_)));

        let staged: Vec<_> = fs::read_dir(dir.path().join("uploads")).unwrap().collect();
        assert!(staged.is_empty());
        // No rejected lines, so no artifact directory either
        assert!(!dir.path().join("logs").exists());

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_retention_cleanup_empties_old_days() {
        let dir = tempfile::tempdir().unwrap();
        let app = start(&dir);
        let upload = write_upload(
            &dir.path().join("in"),
            "old.csv",
            "20000101,080000,a,0,b\n20000102,080000,a,1,b\n",
        );

        let (_, events) = app.coordinator.import(&[upload], false).await;
        assert!(matches!(events[0].state, JobState::Succeeded(_)));
        assert_eq!(app.reports.daily_summary("01-01-2000").await.unwrap().qty, 1);

        let deleted = app.reports.delete_older_than(6).await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(app.reports.daily_summary("01-01-2000").await.unwrap().qty, 0);
        assert!(app.reports.list_sources().await.unwrap().is_empty());

        app.shutdown().await;
    }

    /// One process run against the store file at `store_path`
    async fn run_against_store(
        dir: &TempDir,
        store_path: &Path,
        upload: &Path,
        overwrite: bool,
    ) -> UploadResponse {
        let store = Arc::new(FileStore::open(store_path).await.unwrap());
        let app = IngestApp::start(&test_config(dir.path()), store, Arc::new(MemoryCache::new()));

        let (response, events) = app.coordinator.import(&[upload.to_path_buf()], overwrite).await;
        assert!(events
            .iter()
            .all(|e| matches!(e.state, JobState::Succeeded(_))));

        app.shutdown().await;
        response
    }

    #[tokio::test]
    async fn test_store_file_carries_duplicates_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("data").join("records.jsonl");

        let first = write_upload(
            &dir.path().join("monday"),
            "calls.csv",
            "20250706,080000,a,0,b\n20250706,081000,a,0,b\n",
        );
        let response = run_against_store(&dir, &store_path, &first, false).await;
        assert_eq!(response.summary.queued, 1);

        // A later run sees the earlier import
        let response = run_against_store(&dir, &store_path, &first, false).await;
        assert_eq!(response.summary.skipped, 1);
        assert_eq!(response.details[0].reason.as_deref(), Some("Already uploaded"));

        let replacement = write_upload(
            &dir.path().join("tuesday"),
            "calls.csv",
            "20250706,090000,a,1,b\n",
        );
        let response = run_against_store(&dir, &store_path, &replacement, true).await;
        assert_eq!(response.summary.queued, 1);

        let store = Arc::new(FileStore::open(&store_path).await.unwrap());
        assert_eq!(store.len(), 1);
        let app = IngestApp::start(
            &test_config(dir.path()),
            store,
            Arc::new(MemoryCache::new()),
        );
        let summary = app.reports.daily_summary("06-07-2025").await.unwrap();
        assert_eq!(summary.qty, 1);
        assert_eq!(summary.sys_busy, 1);
        app.shutdown().await;
    }
}
