//! Duplicate-source detection and ingestion reservations
//!
//! A filename is the ingestion key: all records of one upload share it as
//! their `source`. The guard answers "was this file already ingested", purges
//! a source for overwrite, and holds an in-process reservation per filename
//! from submission until the job reaches a terminal state.
//!
//! # Atomicity
//!
//! `reserve` claims the filename in a `DashMap` entry before consulting the
//! store, so two concurrent submissions of the same name cannot both be
//! granted. The entry lock is released before any store call.

use crate::core::traits::{CallRecordStore, RecordFilter};
use crate::types::IngestError;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Outcome of a reservation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The caller now owns the filename; `purged` old rows were removed
    Granted { purged: usize },
    /// Another submission of this filename is queued or running
    AlreadyQueued,
    /// The store already holds this source and overwrite was not requested
    AlreadyIngested,
}

impl Reservation {
    /// Skip reason reported to the submitter, if the reservation was refused
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Reservation::Granted { .. } => None,
            Reservation::AlreadyQueued => Some("Already queued"),
            Reservation::AlreadyIngested => Some("Already uploaded"),
        }
    }
}

/// Ingestion registry keyed by filename
pub struct DuplicateGuard {
    store: Arc<dyn CallRecordStore>,
    in_flight: DashMap<String, DateTime<Utc>>,
}

impl DuplicateGuard {
    pub fn new(store: Arc<dyn CallRecordStore>) -> Self {
        Self {
            store,
            in_flight: DashMap::new(),
        }
    }

    /// Whether any stored record has `source == filename`
    ///
    /// # Errors
    ///
    /// Propagates the store error; callers must not treat it as "absent".
    pub async fn already_ingested(&self, filename: &str) -> Result<bool, IngestError> {
        self.store.exists(&RecordFilter::by_source(filename)).await
    }

    /// Delete every record of `filename`; returns the number deleted
    pub async fn purge(&self, filename: &str) -> Result<usize, IngestError> {
        let purged = self
            .store
            .delete_many(&RecordFilter::by_source(filename))
            .await?;

        if purged > 0 {
            tracing::info!(filename, purged, "Purged existing records");
        }
        Ok(purged)
    }

    /// Atomically claim `filename` for a new import
    ///
    /// # Arguments
    ///
    /// * `filename` - Source name of the submission
    /// * `overwrite` - Purge an existing source instead of refusing it
    ///
    /// # Returns
    ///
    /// `Reservation::Granted` leaves the filename reserved until `release`;
    /// every other outcome leaves no reservation behind.
    ///
    /// # Errors
    ///
    /// A store failure releases the claim and is returned as-is.
    pub async fn reserve(&self, filename: &str, overwrite: bool) -> Result<Reservation, IngestError> {
        match self.in_flight.entry(filename.to_string()) {
            Entry::Occupied(_) => return Ok(Reservation::AlreadyQueued),
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
            }
        }

        match self.claim_source(filename, overwrite).await {
            Ok(Reservation::Granted { purged }) => Ok(Reservation::Granted { purged }),
            Ok(refused) => {
                self.release(filename);
                Ok(refused)
            }
            Err(e) => {
                self.release(filename);
                Err(e)
            }
        }
    }

    /// Drop the reservation of `filename`
    pub fn release(&self, filename: &str) {
        self.in_flight.remove(filename);
    }

    pub fn is_reserved(&self, filename: &str) -> bool {
        self.in_flight.contains_key(filename)
    }

    async fn claim_source(&self, filename: &str, overwrite: bool) -> Result<Reservation, IngestError> {
        if !self.already_ingested(filename).await? {
            return Ok(Reservation::Granted { purged: 0 });
        }
        if !overwrite {
            return Ok(Reservation::AlreadyIngested);
        }

        let purged = self.purge(filename).await?;
        Ok(Reservation::Granted { purged })
    }
}
