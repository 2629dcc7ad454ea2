//! Row parsing and validation
//!
//! Turns one raw line of an uploaded call export into either a validated
//! [`CallRecord`] or a [`RejectReason`]. Pure: no I/O, no logging.
//!
//! # Line Shape
//!
//! ```text
//! 20250706,083015,<...>,0,<last>
//! └─date─┘ └time┘       └┬┘
//!                        close reason (second-to-last field)
//! ```
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. blank lines are skipped, not rejected
//! 2. fewer than three fields: `Too few columns`
//! 3. date not `YYYYMMDD`: `Invalid date format`
//! 4. time not `HHMMSS` / `HH:MM:SS`, or hour above 23: `Invalid time format`
//! 5. field validation of the assembled record: `DTO validation failed: ...`

use crate::types::{CallRecord, FieldViolation, RejectReason};

/// Field delimiter of the call export
pub const FIELD_DELIMITER: char = ',';

/// Minimum number of fields of a usable line
pub const MIN_COLUMNS: usize = 3;

/// Outcome of parsing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Empty or whitespace-only; neither stored nor quarantined
    Blank,
    Record(CallRecord),
    Rejected(RejectReason),
}

/// A record assembled from raw fields, before field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCandidate<'a> {
    pub date: String,
    pub hour: u8,
    pub time: &'a str,
    pub close_reason: &'a str,
    pub source: &'a str,
}

/// Parse one raw line belonging to `source`
pub fn parse_line(line: &str, source: &str) -> ParsedLine {
    if line.trim().is_empty() {
        return ParsedLine::Blank;
    }

    let columns: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if columns.len() < MIN_COLUMNS {
        return ParsedLine::Rejected(RejectReason::TooFewColumns);
    }

    let raw_date = columns[0];
    let raw_time = columns[1];
    let raw_close_reason = columns[columns.len() - 2];

    let Some(date) = canonical_date(raw_date) else {
        return ParsedLine::Rejected(RejectReason::InvalidDate);
    };

    let Some(hour) = parse_hour(raw_time) else {
        return ParsedLine::Rejected(RejectReason::InvalidTime);
    };

    let candidate = RecordCandidate {
        date,
        hour,
        time: raw_time,
        close_reason: raw_close_reason,
        source,
    };

    match validate_candidate(candidate) {
        Ok(record) => ParsedLine::Record(record),
        Err(violations) => ParsedLine::Rejected(RejectReason::Validation(violations)),
    }
}

/// Reformat an 8-digit `YYYYMMDD` token as `DD-MM-YYYY`
///
/// The token is split by position only; `20250231` becomes `31-02-2025`.
pub fn canonical_date(token: &str) -> Option<String> {
    if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(format!("{}-{}-{}", &token[6..8], &token[4..6], &token[0..4]))
}

/// Extract the hour of a `HHMMSS` or `HH:MM:SS` token
pub fn parse_hour(token: &str) -> Option<u8> {
    let bytes = token.as_bytes();

    let well_formed = match bytes.len() {
        6 => bytes.iter().all(u8::is_ascii_digit),
        8 => bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b':',
            _ => b.is_ascii_digit(),
        }),
        _ => false,
    };
    if !well_formed {
        return None;
    }

    let hour: u8 = token[0..2].parse().ok()?;
    (hour <= 23).then_some(hour)
}

/// Field-level validation of an assembled record
///
/// Collects every violation rather than stopping at the first one.
pub fn validate_candidate(candidate: RecordCandidate<'_>) -> Result<CallRecord, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    if candidate.date.is_empty() {
        violations.push(FieldViolation::new("date", "should not be empty"));
    }

    if candidate.hour > 23 {
        violations.push(FieldViolation::new("hour", "must not be greater than 23"));
    }

    if candidate.time.is_empty() {
        violations.push(FieldViolation::new("time", "should not be empty"));
    }

    let close_reason = match candidate.close_reason.trim().parse::<i32>() {
        Ok(code) => Some(code),
        Err(_) => {
            violations.push(FieldViolation::new("closeReason", "must be an integer number"));
            None
        }
    };

    if candidate.source.trim().is_empty() {
        violations.push(FieldViolation::new("source", "should not be empty"));
    }

    match close_reason {
        Some(close_reason) if violations.is_empty() => Ok(CallRecord {
            date: candidate.date,
            hour: candidate.hour,
            time: candidate.time.to_string(),
            close_reason,
            source: candidate.source.to_string(),
        }),
        _ => Err(violations),
    }
}
