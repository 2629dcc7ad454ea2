use crate::config::IngestConfig;
use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Ingest call-center CSV exports and report on them
#[derive(Parser, Debug)]
#[command(name = "call-ingest")]
#[command(about = "Ingest call-center CSV exports and report on them", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Number of records per store write
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        global = true,
        help = "Number of records per store write (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of files ingested concurrently
    #[arg(
        long = "workers",
        value_name = "COUNT",
        global = true,
        help = "Number of files ingested concurrently (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Attempts per file before giving up
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        global = true,
        help = "Attempts per file before giving up (default: 3)"
    )]
    pub max_attempts: Option<u32>,

    /// Delay between two attempts
    #[arg(
        long = "backoff-ms",
        value_name = "MILLIS",
        global = true,
        help = "Delay between two attempts in milliseconds (default: 5000)"
    )]
    pub backoff_ms: Option<u64>,

    #[arg(
        long = "quarantine-dir",
        value_name = "DIR",
        global = true,
        help = "Directory for rejected-line artifacts (default: uploads/logs)"
    )]
    pub quarantine_dir: Option<PathBuf>,

    #[arg(
        long = "staging-dir",
        value_name = "DIR",
        global = true,
        help = "Directory for staged uploads (default: uploads)"
    )]
    pub staging_dir: Option<PathBuf>,

    #[arg(
        long = "store",
        value_name = "PATH",
        global = true,
        help = "JSON-lines record store kept across runs (default: in memory for this run only)"
    )]
    pub store: Option<PathBuf>,

    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        value_enum,
        default_value = "text",
        global = true,
        help = "Log output format on stderr"
    )]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Import CSV files and wait for every job to finish
    Import {
        /// Files to import
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Replace records of files that were already imported
        ///
        /// Only meaningful together with `--store`, where earlier runs are kept.
        #[arg(long)]
        overwrite: bool,

        /// Print the hourly report of this day (DD-MM-YYYY) after importing
        #[arg(long, value_name = "DD-MM-YYYY")]
        report: Option<String>,
    },
}

impl CliArgs {
    /// Apply command-line overrides on top of `base`
    ///
    /// Zero counts fall back to their defaults with a warning.
    ///
    /// # Returns
    ///
    /// An `IngestConfig` with values from CLI arguments where given.
    pub fn apply_to(&self, base: IngestConfig) -> IngestConfig {
        IngestConfig {
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            workers: self.workers.unwrap_or(base.workers),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            backoff: self
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(base.backoff),
            quarantine_dir: self
                .quarantine_dir
                .clone()
                .unwrap_or(base.quarantine_dir),
            staging_dir: self.staging_dir.clone().unwrap_or(base.staging_dir),
            report_ttl: base.report_ttl,
            store_path: self.store.clone().or(base.store_path),
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single(&["program", "import", "a.csv"], vec!["a.csv"], false, None)]
    #[case::several(&["program", "import", "a.csv", "b.csv"], vec!["a.csv", "b.csv"], false, None)]
    #[case::overwrite(&["program", "import", "--overwrite", "a.csv"], vec!["a.csv"], true, None)]
    #[case::report(
        &["program", "import", "a.csv", "--report", "06-07-2025"],
        vec!["a.csv"],
        false,
        Some("06-07-2025")
    )]
    fn test_import_parsing(
        #[case] args: &[&str],
        #[case] expected_files: Vec<&str>,
        #[case] expected_overwrite: bool,
        #[case] expected_report: Option<&str>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let Command::Import {
            files,
            overwrite,
            report,
        } = parsed.command;

        let expected_files: Vec<PathBuf> = expected_files.into_iter().map(PathBuf::from).collect();
        assert_eq!(files, expected_files);
        assert_eq!(overwrite, expected_overwrite);
        assert_eq!(report.as_deref(), expected_report);
    }

    #[rstest]
    #[case::no_options(&["program", "import", "a.csv"], None, None, None, None)]
    #[case::before_subcommand(
        &["program", "--batch-size", "2000", "--workers", "8", "import", "a.csv"],
        Some(2000),
        Some(8),
        None,
        None
    )]
    #[case::after_subcommand(
        &["program", "import", "a.csv", "--max-attempts", "5", "--backoff-ms", "10"],
        None,
        None,
        Some(5),
        Some(10)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] workers: Option<usize>,
        #[case] max_attempts: Option<u32>,
        #[case] backoff_ms: Option<u64>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.workers, workers);
        assert_eq!(parsed.max_attempts, max_attempts);
        assert_eq!(parsed.backoff_ms, backoff_ms);
    }

    #[rstest]
    #[case::all_defaults(&["program", "import", "a.csv"], 1000, num_cpus::get(), 3)]
    #[case::custom(
        &["program", "--batch-size", "250", "--workers", "2", "--max-attempts", "1", "import", "a.csv"],
        250,
        2,
        1
    )]
    #[case::zero_values_fall_back(
        &["program", "--batch-size", "0", "--workers", "0", "--max-attempts", "0", "import", "a.csv"],
        1000,
        num_cpus::get(),
        3
    )]
    fn test_apply_to(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_workers: usize,
        #[case] expected_attempts: u32,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.apply_to(IngestConfig::default());

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.workers, expected_workers);
        assert_eq!(config.max_attempts, expected_attempts);
    }

    #[test]
    fn test_directory_and_backoff_overrides() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--quarantine-dir",
            "/tmp/q",
            "--staging-dir",
            "/tmp/s",
            "--backoff-ms",
            "0",
            "--store",
            "/tmp/records.jsonl",
            "import",
            "a.csv",
        ])
        .unwrap();
        let config = parsed.apply_to(IngestConfig::default());

        assert_eq!(config.quarantine_dir, PathBuf::from("/tmp/q"));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/s"));
        assert_eq!(config.backoff, Duration::ZERO);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/records.jsonl")));
    }

    #[test]
    fn test_store_falls_back_to_environment() {
        let parsed = CliArgs::try_parse_from(["program", "import", "a.csv"]).unwrap();
        let base = IngestConfig {
            store_path: Some(PathBuf::from("/data/records.jsonl")),
            ..IngestConfig::default()
        };

        let config = parsed.apply_to(base);

        assert_eq!(config.store_path, Some(PathBuf::from("/data/records.jsonl")));
    }

    #[rstest]
    #[case::log_text(&["program", "import", "a.csv"], LogFormat::Text)]
    #[case::log_json(&["program", "--log-format", "json", "import", "a.csv"], LogFormat::Json)]
    fn test_log_format(#[case] args: &[&str], #[case] expected: LogFormat) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.log_format, expected);
    }

    // Error handling tests
    #[rstest]
    #[case::missing_subcommand(&["program"])]
    #[case::missing_files(&["program", "import"])]
    #[case::invalid_log_format(&["program", "--log-format", "xml", "import", "a.csv"])]
    #[case::negative_batch(&["program", "--batch-size", "-1", "import", "a.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
