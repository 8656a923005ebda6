//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{format_timestamp, EndpointCounts, RawEvent, RequestOutcome};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a writer waits on a lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite storage backend
///
/// The connection is guarded internally, so one instance can be shared by
/// every collection task through an `Arc`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path`
    ///
    /// Missing parent directories are created. The database runs in WAL mode
    /// so that readers are never blocked behind a collection run.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn, path)
    }

    /// Opens a database that must already exist
    ///
    /// Unlike [`SqliteStorage::new`], nothing is created on disk: a missing
    /// file is an error rather than a fresh empty store.
    pub fn open_existing(path: &Path) -> StorageResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        Self::from_connection(conn, path)
    }

    fn from_connection(conn: Connection, path: &Path) -> StorageResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(
                "SQLite refused WAL mode for {} (using {})",
                path.display(),
                journal_mode
            );
        }

        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }
}

fn outcome_from_row(row: &Row<'_>) -> rusqlite::Result<RequestOutcome> {
    Ok(RequestOutcome {
        id: row.get(0)?,
        ts_utc: row.get(1)?,
        endpoint_name: row.get(2)?,
        url: row.get(3)?,
        status_code: row.get(4)?,
        elapsed_ms: row.get::<_, Option<i64>>(5)?.unwrap_or(0).max(0) as u64,
        attempt: row.get(6)?,
        error: row.get(7)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        ts_utc: row.get(1)?,
        endpoint_name: row.get(2)?,
        url: row.get(3)?,
        payload_json: row.get(4)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Append =====

    fn insert_outcome(&self, outcome: &RequestOutcome) -> StorageResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO request_log
             (id, ts_utc, endpoint_name, url, status_code, elapsed_ms, attempt, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                outcome.id,
                outcome.ts_utc,
                outcome.endpoint_name,
                outcome.url,
                outcome.status_code,
                outcome.elapsed_ms as i64,
                outcome.attempt,
                outcome.error,
            ],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    fn insert_event(&self, event: &RawEvent) -> StorageResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO raw_events
             (id, ts_utc, endpoint_name, url, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.ts_utc,
                event.endpoint_name,
                event.url,
                event.payload_json,
            ],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    // ===== Range Queries =====

    fn outcomes_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<RequestOutcome>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, ts_utc, endpoint_name, url, status_code, elapsed_ms, attempt, error
             FROM request_log
             WHERE ts_utc >= ?1 AND ts_utc <= ?2
             ORDER BY ts_utc, id",
        )?;

        let outcomes = stmt
            .query_map(
                params![format_timestamp(&from), format_timestamp(&to)],
                outcome_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(outcomes)
    }

    fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<RawEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, ts_utc, endpoint_name, url, payload_json
             FROM raw_events
             WHERE ts_utc >= ?1 AND ts_utc <= ?2
             ORDER BY ts_utc, id",
        )?;

        let events = stmt
            .query_map(
                params![format_timestamp(&from), format_timestamp(&to)],
                event_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    // ===== Statistics =====

    fn count_outcomes(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM request_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_events(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM raw_events", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn error_breakdown(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT CASE WHEN instr(error, ':') > 0
                         THEN substr(error, 1, instr(error, ':') - 1)
                         ELSE error END AS class,
                    COUNT(*) AS n
             FROM request_log
             WHERE error IS NOT NULL
             GROUP BY class
             ORDER BY n DESC, class",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn endpoint_breakdown(&self) -> StorageResult<Vec<EndpointCounts>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT names.endpoint_name,
                    (SELECT COUNT(*) FROM request_log r
                      WHERE r.endpoint_name = names.endpoint_name),
                    (SELECT COUNT(*) FROM request_log r
                      WHERE r.endpoint_name = names.endpoint_name
                        AND r.error IS NULL
                        AND r.status_code BETWEEN 200 AND 299),
                    (SELECT COUNT(*) FROM raw_events e
                      WHERE e.endpoint_name = names.endpoint_name)
             FROM (SELECT endpoint_name FROM request_log
                   UNION
                   SELECT endpoint_name FROM raw_events) AS names
             ORDER BY names.endpoint_name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(EndpointCounts {
                    endpoint_name: row.get(0)?,
                    attempts: row.get::<_, i64>(1)? as u64,
                    successful_attempts: row.get::<_, i64>(2)? as u64,
                    events: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
