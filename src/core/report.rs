//! Reports derived from stored call records
//!
//! This module provides the `ReportService` struct, which aggregates one
//! day's records into an hourly breakdown and a daily summary, lists the
//! ingested sources and applies the age-based retention cleanup.
//!
//! # Close Reasons
//!
//! | code  | bucket   |
//! |-------|----------|
//! | 0     | TE busy  |
//! | 1     | Sys busy |
//! | 2..10 | others   |
//!
//! The hourly `others` column counts codes 2 through 10 only; the daily
//! `others` is whatever is neither TE nor Sys busy.
//!
//! # Caching
//!
//! Reports are cached under `hourly:<DD-MM-YYYY>` and `summary:<DD-MM-YYYY>`
//! for the configured time to live. Ingestion and cleanup invalidate the keys
//! of the dates they touch.

use crate::core::traits::{CallRecordStore, RecordFilter, ReportCache};
use crate::io::write_report_csv;
use crate::types::call_record::DATE_FORMAT;
use crate::types::{CallRecord, DailySummary, HourlyReportRow, IngestError, SourceSummary};
use chrono::{Months, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Default time to live of cached reports
pub const DEFAULT_REPORT_TTL: Duration = Duration::from_secs(600);

const TE_BUSY: i32 = 0;
const SYS_BUSY: i32 = 1;
const OTHER_REASONS: std::ops::RangeInclusive<i32> = 2..=10;

pub fn hourly_cache_key(date: &str) -> String {
    format!("hourly:{}", date)
}

pub fn summary_cache_key(date: &str) -> String {
    format!("summary:{}", date)
}

/// Parse a report date given strictly as `DD-MM-YYYY`
///
/// # Errors
///
/// Returns `IngestError::InvalidReportDate` for any other shape, including
/// unpadded fields and days that do not exist.
pub fn parse_report_date(value: &str) -> Result<NaiveDate, IngestError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(IngestError::invalid_report_date(value));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| IngestError::invalid_report_date(value))
}

/// `value / qty` as a percentage with two decimals, e.g. `33.33%`
///
/// Rounds half away from zero; `0.00%` when `qty` is zero.
pub fn format_percent(value: usize, qty: usize) -> String {
    if qty == 0 {
        return "0.00%".to_string();
    }

    let ratio = Decimal::from(value) * Decimal::ONE_HUNDRED / Decimal::from(qty);
    let rounded = ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}%", rounded)
}

/// Retention cutoff: records dated strictly before it are expired
pub fn retention_cutoff(today: NaiveDate, months: u32) -> Option<NaiveDate> {
    today.checked_sub_months(Months::new(months))
}

fn hourly_rows(records: &[CallRecord]) -> Vec<HourlyReportRow> {
    (0u8..24)
        .map(|hour| {
            let in_hour = || records.iter().filter(move |r| r.hour == hour);

            let qty = in_hour().count();
            let te_busy = in_hour().filter(|r| r.close_reason == TE_BUSY).count();
            let sys_busy = in_hour().filter(|r| r.close_reason == SYS_BUSY).count();
            let others = in_hour()
                .filter(|r| OTHER_REASONS.contains(&r.close_reason))
                .count();

            HourlyReportRow {
                time: format!("{:02}.00 - {:02}.59", hour, hour),
                qty,
                te_busy,
                te_busy_percent: format_percent(te_busy, qty),
                sys_busy,
                sys_busy_percent: format_percent(sys_busy, qty),
                others,
                others_percent: format_percent(others, qty),
            }
        })
        .collect()
}

fn summarize_day(date: &str, records: &[CallRecord]) -> DailySummary {
    let qty = records.len();
    let te_busy = records.iter().filter(|r| r.close_reason == TE_BUSY).count();
    let sys_busy = records.iter().filter(|r| r.close_reason == SYS_BUSY).count();
    let others = qty - te_busy - sys_busy;

    DailySummary {
        date: date.to_string(),
        qty,
        te_busy,
        te_busy_percent: format_percent(te_busy, qty),
        sys_busy,
        sys_busy_percent: format_percent(sys_busy, qty),
        others,
        others_percent: format_percent(others, qty),
    }
}

/// Report queries over a record store, cached
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn CallRecordStore>,
    cache: Arc<dyn ReportCache>,
    ttl: Duration,
}

impl ReportService {
    pub fn new(store: Arc<dyn CallRecordStore>, cache: Arc<dyn ReportCache>) -> Self {
        Self {
            store,
            cache,
            ttl: DEFAULT_REPORT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// 24 hourly rows for `date` (`DD-MM-YYYY`)
    ///
    /// # Errors
    ///
    /// `InvalidReportDate` for a malformed date, or the store error.
    pub async fn hourly_report(&self, date: &str) -> Result<Vec<HourlyReportRow>, IngestError> {
        let day = parse_report_date(date)?;
        let key = hourly_cache_key(date);

        if let Some(rows) = self.cached(&key).await {
            return Ok(rows);
        }

        let records = self.records_of(day).await?;
        let rows = hourly_rows(&records);

        self.remember(&key, &rows).await;
        Ok(rows)
    }

    /// Whole-day breakdown for `date` (`DD-MM-YYYY`)
    pub async fn daily_summary(&self, date: &str) -> Result<DailySummary, IngestError> {
        let day = parse_report_date(date)?;
        let key = summary_cache_key(date);

        if let Some(summary) = self.cached(&key).await {
            return Ok(summary);
        }

        let records = self.records_of(day).await?;
        let summary = summarize_day(&day.format(DATE_FORMAT).to_string(), &records);

        self.remember(&key, &summary).await;
        Ok(summary)
    }

    /// Hourly report of `date` followed by its totals, as CSV
    pub async fn export_csv(&self, date: &str, output: &mut dyn Write) -> Result<(), IngestError> {
        let rows = self.hourly_report(date).await?;
        let summary = self.daily_summary(date).await?;

        write_report_csv(&rows, &summary, output).map_err(|message| IngestError::Io { message })
    }

    /// Ingested sources, most recently uploaded first
    pub async fn list_sources(&self) -> Result<Vec<SourceSummary>, IngestError> {
        self.store.summarize_sources().await
    }

    /// Delete records dated more than `months` months before today
    ///
    /// Returns the number of records deleted.
    pub async fn delete_older_than(&self, months: u32) -> Result<usize, IngestError> {
        let today = Utc::now().date_naive();
        let cutoff = retention_cutoff(today, months).ok_or_else(|| {
            IngestError::invalid_config("months", format!("{} months is out of range", months))
        })?;

        self.delete_before(cutoff).await
    }

    /// Delete records whose calendar date is strictly before `cutoff`
    pub async fn delete_before(&self, cutoff: NaiveDate) -> Result<usize, IngestError> {
        let filter = RecordFilter::older_than(cutoff);

        let dates: BTreeSet<String> = self
            .store
            .find(&filter)
            .await?
            .into_iter()
            .map(|r| r.date)
            .collect();

        let deleted = self.store.delete_many(&filter).await?;
        self.invalidate_dates(&dates).await;

        tracing::info!(%cutoff, deleted, "Deleted expired records");
        Ok(deleted)
    }

    /// Drop cached reports of every given date
    pub async fn invalidate_dates<'a, I>(&self, dates: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for date in dates {
            self.cache.invalidate(&hourly_cache_key(date)).await;
            self.cache.invalidate(&summary_cache_key(date)).await;
        }
    }

    async fn records_of(&self, day: NaiveDate) -> Result<Vec<CallRecord>, IngestError> {
        let date = day.format(DATE_FORMAT).to_string();
        self.store.find(&RecordFilter::by_date(&date)).await
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key).await?;
        serde_json::from_value(value).ok()
    }

    async fn remember<T: Serialize + Sync>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(json) => self.cache.set(key, json, self.ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "Failed to cache report"),
        }
    }
}
