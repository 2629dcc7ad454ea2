//! Report row types
//!
//! Derived on demand from stored call records; never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Busy-reason breakdown for one hour of one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyReportRow {
    /// Hour label, e.g. `08.00 - 08.59`
    pub time: String,
    pub qty: usize,
    pub te_busy: usize,
    pub te_busy_percent: String,
    pub sys_busy: usize,
    pub sys_busy_percent: String,
    pub others: usize,
    pub others_percent: String,
}

/// Busy-reason breakdown for a whole day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// Day in `DD-MM-YYYY` form
    pub date: String,
    pub qty: usize,
    pub te_busy: usize,
    pub te_busy_percent: String,
    pub sys_busy: usize,
    pub sys_busy_percent: String,
    /// Always `qty - te_busy - sys_busy`
    pub others: usize,
    pub others_percent: String,
}

/// Per-source aggregate over stored records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source: String,
    pub count: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}
