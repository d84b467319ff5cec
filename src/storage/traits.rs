//! Sink traits and error types
//!
//! This module defines the persistence interface consumed by the crawl
//! controller. Claim-based deduplication is an optional capability exposed
//! through [`Sink::claims`], so callers can tell at runtime whether a sink
//! can recognise listings it has already stored.

use crate::record::JobListingRecord;
use thiserror::Error;

/// Errors that can occur during sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backing store could not be opened or reached
    #[error("Store unavailable: {0}")]
    Connection(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Persistence backend for extracted listings
pub trait Sink {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Records that `keyword` has been searched
    ///
    /// Idempotent. Backends without cross-run memory treat this as a no-op.
    fn register_keyword(&mut self, keyword: &str) -> SinkResult<()>;

    /// Stores the full record
    fn persist(&mut self, record: &JobListingRecord) -> SinkResult<()>;

    /// Claim capability, if this backend deduplicates
    ///
    /// Returns `None` for sinks that cannot tell whether a listing was seen
    /// before; every record handed to them is treated as new.
    fn claims(&mut self) -> Option<&mut dyn ClaimSet> {
        None
    }
}

/// Keyword-scoped membership sets with atomic test-and-insert
pub trait ClaimSet {
    /// Inserts `offer_id` into the set scoped to `keyword`
    ///
    /// Returns `true` the first time the pair is seen and `false` on every
    /// later call. Testing and inserting happen in a single step.
    fn try_claim(&mut self, keyword: &str, offer_id: &str) -> SinkResult<bool>;

    /// Claims `record.offer_id` for `keyword` and stores the record as one unit
    ///
    /// Returns `true` when the claim was new and the record was stored. On
    /// error neither the claim nor the record is kept, so a later run sees
    /// the offer as new again.
    fn claim_and_persist(&mut self, keyword: &str, record: &JobListingRecord)
        -> SinkResult<bool>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn register_keyword(&mut self, keyword: &str) -> SinkResult<()> {
        (**self).register_keyword(keyword)
    }

    fn persist(&mut self, record: &JobListingRecord) -> SinkResult<()> {
        (**self).persist(record)
    }

    fn claims(&mut self) -> Option<&mut dyn ClaimSet> {
        (**self).claims()
    }
}
