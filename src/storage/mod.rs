//! Storage module for persisting collection history
//!
//! This module handles all database operations for the collector, including:
//! - SQLite database initialization and schema management
//! - Append-only request outcome and raw event logs
//! - Content-derived row identities for idempotent inserts
//! - Read-only range queries for downstream reporting

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_VERSION};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Formats a timestamp the way it is stored
///
/// Fixed-width microsecond precision with a `Z` suffix, so that string order
/// matches time order in range queries.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Hex-encoded SHA-256 of a string
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// One physical HTTP attempt, as stored in `request_log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub id: String,
    pub ts_utc: String,
    pub endpoint_name: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub elapsed_ms: u64,
    pub attempt: u32,
    pub error: Option<String>,
}

impl RequestOutcome {
    /// Creates an outcome stamped with the current time
    pub fn new(
        endpoint_name: &str,
        url: &str,
        status_code: Option<u16>,
        elapsed_ms: u64,
        attempt: u32,
        error: Option<String>,
    ) -> Self {
        Self::new_at(Utc::now(), endpoint_name, url, status_code, elapsed_ms, attempt, error)
    }

    /// Creates an outcome with an explicit timestamp
    ///
    /// The identity covers timestamp, endpoint, URL, attempt, status and error.
    /// Elapsed time is not part of it.
    pub fn new_at(
        ts: DateTime<Utc>,
        endpoint_name: &str,
        url: &str,
        status_code: Option<u16>,
        elapsed_ms: u64,
        attempt: u32,
        error: Option<String>,
    ) -> Self {
        let ts_utc = format_timestamp(&ts);
        let key = format!(
            "{}|{}|{}|{}|{}|{}",
            ts_utc,
            endpoint_name,
            url,
            attempt,
            status_code.map(|s| s.to_string()).unwrap_or_default(),
            error.as_deref().unwrap_or("")
        );

        Self {
            id: sha256_hex(&key),
            ts_utc,
            endpoint_name: endpoint_name.to_string(),
            url: url.to_string(),
            status_code,
            elapsed_ms,
            attempt,
            error,
        }
    }

    /// Returns true for a 2xx attempt with no recorded error
    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status_code, Some(200..=299))
    }
}

/// One successfully parsed payload, as stored in `raw_events`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub id: String,
    pub ts_utc: String,
    pub endpoint_name: String,
    pub url: String,
    pub payload_json: String,
}

impl RawEvent {
    /// Creates an event stamped with the current time
    pub fn new(endpoint_name: &str, url: &str, payload: &serde_json::Value) -> StorageResult<Self> {
        Self::new_at(Utc::now(), endpoint_name, url, payload)
    }

    /// Creates an event with an explicit timestamp
    ///
    /// The payload is stored as compact JSON; the identity covers endpoint,
    /// URL, timestamp and the hash of that JSON text.
    pub fn new_at(
        ts: DateTime<Utc>,
        endpoint_name: &str,
        url: &str,
        payload: &serde_json::Value,
    ) -> StorageResult<Self> {
        let payload_json = serde_json::to_string(payload)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let ts_utc = format_timestamp(&ts);
        let key = format!(
            "{}|{}|{}|{}",
            endpoint_name,
            url,
            ts_utc,
            sha256_hex(&payload_json)
        );

        Ok(Self {
            id: sha256_hex(&key),
            ts_utc,
            endpoint_name: endpoint_name.to_string(),
            url: url.to_string(),
            payload_json,
        })
    }
}

/// Per-endpoint row counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCounts {
    pub endpoint_name: String,
    pub attempts: u64,
    pub successful_attempts: u64,
    pub events: u64,
}
