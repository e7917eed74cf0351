//! SQLite-backed key/value storage with per-entry expiry.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Errors from the TTL stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key/value table where every entry carries an absolute expiry.
///
/// Expired rows are invisible to reads immediately and physically removed by
/// [`SqliteKvStore::purge_expired`].
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_kv_entries_expires ON kv_entries(expires_at);
            "#,
        )
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Store `value` under `key`, replacing any previous entry and resetting its TTL.
    pub fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = now_ms() + ttl.as_millis() as i64;
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    /// Read an unexpired entry.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1 AND expires_at > ?2",
                params![key, now_ms()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Atomically read and delete an unexpired entry.
    pub fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?
            .query_row(
                "DELETE FROM kv_entries WHERE key = ?1 AND expires_at > ?2 RETURNING value",
                params![key, now_ms()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Delete an entry. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let affected = self
            .lock()?
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Remove every expired entry. Returns the number of rows deleted.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        self.lock()?
            .execute(
                "DELETE FROM kv_entries WHERE expires_at <= ?1",
                params![now_ms()],
            )
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
