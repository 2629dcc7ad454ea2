//! I/O module
//!
//! Handles file input and artifact output.
//!
//! # Components
//!
//! - `line_reader` - Asynchronous streaming line reader over uploaded files
//! - `quarantine` - Lazily created artifact of rejected lines
//! - `staging` - Copies submitted files into the staging directory
//! - `csv_format` - CSV rendering of the hourly report

pub mod csv_format;
pub mod line_reader;
pub mod quarantine;
pub mod staging;

pub use csv_format::write_report_csv;
pub use line_reader::{LineReader, RawLine};
pub use quarantine::QuarantineSink;
pub use staging::{is_csv_filename, stage_upload};
