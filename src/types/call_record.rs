//! Call record types
//!
//! A `CallRecord` is one validated row of an uploaded call-center export.
//! Records are created in bulk by an ingestion job and never mutated after
//! insert; they are only deleted in bulk, by source or by age.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Display format of `CallRecord::date`
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// A validated call-center event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Calendar day in `DD-MM-YYYY` form
    pub date: String,

    /// Hour of the call, always in 0..=23
    pub hour: u8,

    /// Raw time token as it appeared in the file (`HHMMSS` or `HH:MM:SS`)
    pub time: String,

    /// Close reason code
    ///
    /// 0 is a terminal-equipment busy, 1 a system busy, 2..=10 other reasons.
    pub close_reason: i32,

    /// Name of the uploaded file this record came from
    ///
    /// Acts as the ingestion batch key: overwrite and duplicate checks
    /// operate on all records sharing a source.
    pub source: String,
}

impl CallRecord {
    /// Parse `date` back into a calendar date
    ///
    /// Returns `None` for positional dates that are not real days
    /// (e.g. `31-02-2025`), which the parser accepts as-is.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// A call record as held by a store, with its insertion time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCallRecord {
    pub record: CallRecord,
    pub inserted_at: DateTime<Utc>,
}
