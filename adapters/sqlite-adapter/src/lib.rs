//! sqlite-adapter — SQLite implementation of the `KeyValueStore` port.
//!
//! Purpose
//! - Give the link registry a durable, file-based store so links survive
//!   across runs without any server.
//! - One table of string keys to string values; the registry keeps its whole
//!   collection under a single key, so every save rewrites one row.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Several handles may open the same file. Writes are serialized by SQLite,
//!   but a load/modify/save cycle is not, so overlapping cycles lose updates.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use domain::{KeyValueStore, StorageError};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed key-value store.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::from_connection(conn)
    }

    /// Like [`SqliteKv::new`] but creates missing parent directories first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| StorageError::Backend(format!("create {}: {e}", dir.display())))?;
        }
        tracing::debug!(path = %path.display(), "opening sqlite key-value store");
        Self::new(path)
    }

    /// Private database that disappears with the handle.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory().map_err(map_sqerr)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Backend("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(format!("sqlite error: {e}"))
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sqerr)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store(key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(map_sqerr)?;
        Ok(())
    }
}
