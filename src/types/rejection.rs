//! Row-level rejection types
//!
//! A rejected row never aborts an ingestion job. It is described by a
//! `RejectReason` and streamed to the job's quarantine artifact together
//! with the original line text.

use std::fmt;

/// A single field-level constraint violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Name of the offending attribute as it appears in the persisted record
    pub field: &'static str,
    /// Human-readable constraint, e.g. "must be an integer number"
    pub constraint: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, constraint: impl Into<String>) -> Self {
        Self {
            field,
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.constraint)
    }
}

/// Why a line was not turned into a call record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Fewer than three comma-delimited fields
    TooFewColumns,

    /// First field is not an 8-digit `YYYYMMDD` token
    InvalidDate,

    /// Second field is neither `HHMMSS` nor `HH:MM:SS`, or its hour is above 23
    InvalidTime,

    /// The assembled record failed field validation
    Validation(Vec<FieldViolation>),

    /// The line could not be decoded at all
    Unreadable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooFewColumns => f.write_str("Too few columns"),
            RejectReason::InvalidDate => f.write_str("Invalid date format"),
            RejectReason::InvalidTime => f.write_str("Invalid time format"),
            RejectReason::Validation(violations) => {
                f.write_str("DTO validation failed: ")?;
                for (i, violation) in violations.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", violation)?;
                }
                Ok(())
            }
            RejectReason::Unreadable(message) if message.is_empty() => f.write_str("Unknown error"),
            RejectReason::Unreadable(message) => f.write_str(message),
        }
    }
}

/// A rejected input line, as written to the quarantine artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number in the source file
    pub line_number: u64,
    /// Original raw text of the line
    pub line: String,
    pub reason: RejectReason,
}
