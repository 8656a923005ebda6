//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{EndpointCounts, RawEvent, RequestOutcome};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Both logs are append-only. Inserts are idempotent on the row identity: a
/// second insert of the same identity is a no-op that returns `Ok(false)`.
/// Implementations must be shareable across collection tasks without
/// external locking.
pub trait Storage: Send + Sync {
    // ===== Append =====

    /// Records one physical HTTP attempt
    ///
    /// # Returns
    ///
    /// `true` if a new row was written, `false` if the identity already existed
    fn insert_outcome(&self, outcome: &RequestOutcome) -> StorageResult<bool>;

    /// Records one parsed payload
    ///
    /// # Returns
    ///
    /// `true` if a new row was written, `false` if the identity already existed
    fn insert_event(&self, event: &RawEvent) -> StorageResult<bool>;

    // ===== Range Queries =====

    /// Gets outcomes with `from <= ts_utc <= to`, oldest first
    fn outcomes_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<RequestOutcome>>;

    /// Gets events with `from <= ts_utc <= to`, oldest first
    fn events_between(&self, from: DateTime<Utc>, to: DateTime<Utc>)
        -> StorageResult<Vec<RawEvent>>;

    // ===== Statistics =====

    /// Counts all outcome rows
    fn count_outcomes(&self) -> StorageResult<u64>;

    /// Counts all event rows
    fn count_events(&self) -> StorageResult<u64>;

    /// Counts failed attempts by error class (the text before the first `:`)
    ///
    /// Sorted by descending count.
    fn error_breakdown(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Gets attempt, success and event counts per endpoint, sorted by name
    fn endpoint_breakdown(&self) -> StorageResult<Vec<EndpointCounts>>;
}
