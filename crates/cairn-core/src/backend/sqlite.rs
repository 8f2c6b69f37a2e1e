//! SQLite-based storage backend.

use super::traits::StorageBackend;
use crate::config::StoreConfig;
use crate::error::{CairnError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Durable storage backend over a single SQLite file.
///
/// All operations are synchronous to match rusqlite's API. Thread-safe via
/// an internal mutex on the connection. Enumeration order for
/// [`key_at`](StorageBackend::key_at) is rowid (insertion) order;
/// overwriting a record keeps its rowid.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open the backend at the specified database path.
    ///
    /// Creates the database, parent directories, and schema if they don't
    /// exist.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| CairnError::Io {
                    message: format!(
                        "Failed to create backend directory: {}",
                        parent.display()
                    ),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        debug!("Opened storage backend at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database. Useful for throwaway tooling; tests
    /// normally use [`MemoryBackend`](super::MemoryBackend) instead.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;",
            StoreConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
            table = StoreConfig::RECORDS_TABLE,
        ))?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CairnError::Database {
            message: "Failed to acquire backend connection lock".to_string(),
            source: None,
        })
    }
}

impl StorageBackend for SqliteBackend {
    fn get(&self, storage_key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT value FROM {} WHERE key = ?1",
                    StoreConfig::RECORDS_TABLE
                ),
                params![storage_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw)
    }

    fn set(&self, storage_key: &str, raw: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        // Upsert keeps the rowid, so enumeration order is stable across
        // overwrites.
        conn.execute(
            &format!(
                "INSERT INTO {table} (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                table = StoreConfig::RECORDS_TABLE,
            ),
            params![storage_key, raw, now],
        )?;
        Ok(())
    }

    fn remove(&self, storage_key: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE key = ?1",
                StoreConfig::RECORDS_TABLE
            ),
            params![storage_key],
        )?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", StoreConfig::RECORDS_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let key = conn
            .query_row(
                &format!(
                    "SELECT key FROM {} ORDER BY rowid LIMIT 1 OFFSET ?1",
                    StoreConfig::RECORDS_TABLE
                ),
                params![index as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SqliteBackend) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let backend = SqliteBackend::open(dir.path().join("records.sqlite")).unwrap();
        (dir, backend)
    }

    #[test]
    fn round_trip_and_overwrite() {
        let (_dir, backend) = open_temp();
        backend.set("k", "v1").unwrap();
        backend.set("k", "v2").unwrap();

        assert_eq!(backend.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(backend.len().unwrap(), 1);
    }

    #[test]
    fn enumeration_is_insertion_ordered() {
        let (_dir, backend) = open_temp();
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();
        backend.set("b", "3").unwrap();

        assert_eq!(backend.key_at(0).unwrap().as_deref(), Some("b"));
        assert_eq!(backend.key_at(1).unwrap().as_deref(), Some("a"));
        assert!(backend.key_at(2).unwrap().is_none());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.sqlite");
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.set("k", "persisted").unwrap();
        }
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("records.sqlite");
        let backend = SqliteBackend::open(&nested).unwrap();
        backend.set("k", "v").unwrap();
        assert!(nested.exists());
    }
}
