//! Asynchronous line reader over uploaded call exports
//!
//! Streams a file one line at a time with constant memory, however large the
//! file is.
//!
//! # Design
//!
//! The LineReader uses:
//! - csv-async for buffered line splitting (no header, flexible width,
//!   quoting disabled so a line splits exactly on commas)
//! - tokio for async file I/O, bridged through tokio-util's compat layer
//!
//! Each line is handed out as raw text; field parsing and validation belong
//! to [`crate::core::parser`].
//!
//! # Architecture
//!
//! ```text
//! tokio::fs::File → compat → csv-async → LineReader → RawLine
//!                                                        ↓
//!                                              core::parser::parse_line
//! ```

use crate::types::IngestError;
use csv_async::{AsyncReaderBuilder, ByteRecord};
use futures::io::AsyncRead;
use std::path::Path;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

/// One line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based line number
    pub number: u64,

    /// Line text without its terminator
    ///
    /// Lossily decoded when `decode_error` is set.
    pub text: String,

    /// Why the line is not valid UTF-8, if it is not
    pub decode_error: Option<String>,
}

/// Asynchronous line reader
pub struct LineReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncReader<R>,
    record: ByteRecord,
}

impl LineReader<Compat<tokio::fs::File>> {
    /// Open a file for streaming
    ///
    /// # Errors
    ///
    /// Returns `IngestError::FileOpen` if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, IngestError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| IngestError::file_open(path, &e))?;

        Ok(Self::new(file.compat()))
    }
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    /// Create a new LineReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .create_reader(reader);

        Self {
            csv_reader,
            record: ByteRecord::new(),
        }
    }

    /// Read the next line
    ///
    /// Empty lines are not reported. Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Read` if the underlying stream fails.
    pub async fn next_line(&mut self) -> Result<Option<RawLine>, IngestError> {
        if !self.csv_reader.read_byte_record(&mut self.record).await? {
            return Ok(None);
        }

        let number = self.record.position().map(|pos| pos.line()).unwrap_or(0);

        let mut bytes = Vec::new();
        for (i, field) in self.record.iter().enumerate() {
            if i > 0 {
                bytes.push(b',');
            }
            bytes.extend_from_slice(field);
        }

        let line = match String::from_utf8(bytes) {
            Ok(text) => RawLine {
                number,
                text,
                decode_error: None,
            },
            Err(e) => RawLine {
                number,
                decode_error: Some(e.utf8_error().to_string()),
                text: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            },
        };

        Ok(Some(line))
    }
}
