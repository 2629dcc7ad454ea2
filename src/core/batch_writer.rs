//! Bounded batching of validated records into the store
//!
//! This module provides the `BatchWriter` struct, which accumulates records
//! and hands them to a [`CallRecordStore`] in fixed-size batches so memory
//! stays bounded while a file of any size streams through.
//!
//! # Design
//!
//! The buffer is owned by the writer. On every flush the full buffer is moved
//! into the store call and replaced by a fresh one of the same capacity, so a
//! batch handed to the store is never touched again.
//!
//! # Guarantees
//!
//! - a flush happens exactly when the buffer reaches `batch_size`
//! - `finish` flushes a non-empty remainder and never issues an empty call
//! - records reach the store in arrival order
//! - `total_written` counts only records of acknowledged batches

use crate::core::traits::CallRecordStore;
use crate::types::{CallRecord, IngestError};

/// Records per store call
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Size-bounded buffer in front of a record store
pub struct BatchWriter<'a> {
    store: &'a dyn CallRecordStore,
    batch_size: usize,
    buffer: Vec<CallRecord>,
    total_written: usize,
}

impl<'a> BatchWriter<'a> {
    /// Create a new BatchWriter
    ///
    /// # Arguments
    ///
    /// * `store` - Destination of the batches
    /// * `batch_size` - Records per batch; zero falls back to `DEFAULT_BATCH_SIZE`
    pub fn new(store: &'a dyn CallRecordStore, batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };

        Self {
            store,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            total_written: 0,
        }
    }

    /// Buffer one record, flushing when the batch is full
    ///
    /// # Errors
    ///
    /// Propagates the store error of a failed flush. The failed batch is
    /// dropped and not counted.
    pub async fn push(&mut self, record: CallRecord) -> Result<(), IngestError> {
        self.buffer.push(record);

        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Records acknowledged by the store so far
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Records buffered but not yet written
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Flush the remainder and return the total written
    pub async fn finish(mut self) -> Result<usize, IngestError> {
        if !self.buffer.is_empty() {
            self.flush().await?;
        }
        Ok(self.total_written)
    }

    async fn flush(&mut self) -> Result<(), IngestError> {
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let size = batch.len();

        let written = self.store.insert_many(batch).await?;
        self.total_written += written;

        tracing::debug!(
            batch = size,
            total = self.total_written,
            "Flushed batch"
        );
        Ok(())
    }
}
