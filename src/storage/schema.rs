//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the collector database.
//! Downstream reporting reads these tables directly, so column names are part
//! of the external interface.

/// Schema version recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per physical HTTP attempt
CREATE TABLE IF NOT EXISTS request_log (
    id TEXT PRIMARY KEY,
    ts_utc TEXT NOT NULL,
    endpoint_name TEXT NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER,
    elapsed_ms INTEGER,
    attempt INTEGER NOT NULL,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_request_log_ts ON request_log(ts_utc);
CREATE INDEX IF NOT EXISTS idx_request_log_endpoint ON request_log(endpoint_name);

-- One row per successfully parsed payload
CREATE TABLE IF NOT EXISTS raw_events (
    id TEXT PRIMARY KEY,
    ts_utc TEXT NOT NULL,
    endpoint_name TEXT NOT NULL,
    url TEXT NOT NULL,
    payload_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_raw_events_ts ON raw_events(ts_utc);
CREATE INDEX IF NOT EXISTS idx_raw_events_endpoint ON raw_events(endpoint_name);
"#;

/// Initializes the database schema
///
/// Idempotent: existing tables and rows are left untouched.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
