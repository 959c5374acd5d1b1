//! Embedded SQLite key/value backend.
//!
//! One `kv` table; values are MessagePack blobs. Multi-key writes commit
//! in a single transaction.

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use crate::protocol::now_ms;

/// Storage error type.
#[derive(Debug)]
pub enum StorageError {
    /// Backing store unavailable or rejected the operation.
    Sqlite(String),
    /// Value could not be serialized.
    Encode(String),
    /// Persisted value could not be deserialized.
    Decode(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Sqlite(e) => write!(f, "sqlite error: {}", e),
            StorageError::Encode(e) => write!(f, "encode error: {}", e),
            StorageError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e.to_string())
    }
}

/// SQLite-backed key/value store.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteBackend {
    /// Open (or create) the database and prepare the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA wal_autocheckpoint = 1000;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key        TEXT PRIMARY KEY,
                 value      BLOB NOT NULL,
                 updated_at INTEGER NOT NULL
             );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get_many_raw(&self, keys: &[&str]) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let value = stmt
                .query_row(rusqlite::params![key], |row| row.get::<_, Vec<u8>>(0))
                .optional()?;
            if let Some(value) = value {
                out.push(((*key).to_string(), value));
            }
        }
        Ok(out)
    }

    /// Write a batch of entries in one transaction.
    pub fn set_many_raw(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let now = now_ms();
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
            )?;
            for (key, value) in entries {
                stmt.execute(rusqlite::params![key, value, now as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a key immediately.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }

    /// Checkpoint the WAL, called on shutdown.
    pub fn checkpoint(&self) {
        let conn = self.conn.lock();
        if let Err(e) = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
            warn!(error = %e, "Failed to checkpoint WAL");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, SqliteBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path().join("test.db")).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_roundtrip_and_overwrite() {
        let (_dir, backend) = open_temp();
        backend
            .set_many_raw(&[("a".to_string(), vec![1, 2, 3])])
            .unwrap();
        assert_eq!(backend.get_raw("a").unwrap(), Some(vec![1, 2, 3]));

        backend
            .set_many_raw(&[("a".to_string(), vec![9])])
            .unwrap();
        assert_eq!(backend.get_raw("a").unwrap(), Some(vec![9]));
    }

    #[test]
    fn test_missing_key_and_remove() {
        let (_dir, backend) = open_temp();
        assert_eq!(backend.get_raw("missing").unwrap(), None);

        backend
            .set_many_raw(&[("gone".to_string(), vec![0])])
            .unwrap();
        backend.remove("gone").unwrap();
        assert_eq!(backend.get_raw("gone").unwrap(), None);
    }

    #[test]
    fn test_get_many_skips_absent_keys() {
        let (_dir, backend) = open_temp();
        backend
            .set_many_raw(&[
                ("x".to_string(), vec![1]),
                ("y".to_string(), vec![2]),
            ])
            .unwrap();
        let found = backend.get_many_raw(&["x", "absent", "y"]).unwrap();
        assert_eq!(found.len(), 2);
    }
}
