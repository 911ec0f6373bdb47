//! Key-value storage backends: SQLite, in-memory, and no-op.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{SyncError, SyncResult};

/// Trait for raw storage backends.
///
/// Backends report failures; the [`KvStore`](super::KvStore) facade is what
/// swallows them for callers.
pub trait KvBackend: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> SyncResult<Option<String>>;

  /// Insert or replace the value stored under `key`.
  fn set(&self, key: &str, value: &str) -> SyncResult<()>;

  /// Delete `key`. Deleting a missing key is not an error.
  fn remove(&self, key: &str) -> SyncResult<()>;

  /// Enumerate every stored key.
  fn keys(&self) -> SyncResult<Vec<String>>;

  /// Delete a batch of keys.
  fn remove_many(&self, keys: &[String]) -> SyncResult<()> {
    for key in keys {
      self.remove(key)?;
    }
    Ok(())
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl KvBackend for NoopStorage {
  fn get(&self, _key: &str) -> SyncResult<Option<String>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> SyncResult<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> SyncResult<()> {
    Ok(())
  }

  fn keys(&self) -> SyncResult<Vec<String>> {
    Ok(Vec::new())
  }
}

/// In-memory storage with switchable failure injection.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<BTreeMap<String, String>>,
  fail_reads: AtomicBool,
  fail_writes: AtomicBool,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every subsequent read (`get`, `keys`) fail.
  pub fn set_fail_reads(&self, fail: bool) {
    self.fail_reads.store(fail, Ordering::SeqCst);
  }

  /// Make every subsequent write (`set`, `remove`) fail.
  pub fn set_fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  fn check_reads(&self) -> SyncResult<()> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(SyncError::Storage("injected read failure".to_string()));
    }
    Ok(())
  }

  fn check_writes(&self) -> SyncResult<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(SyncError::Storage("injected write failure".to_string()));
    }
    Ok(())
  }

  fn entries(&self) -> SyncResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
    self
      .entries
      .lock()
      .map_err(|e| SyncError::Storage(format!("Lock poisoned: {}", e)))
  }
}

impl KvBackend for MemoryStorage {
  fn get(&self, key: &str) -> SyncResult<Option<String>> {
    self.check_reads()?;
    Ok(self.entries()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> SyncResult<()> {
    self.check_writes()?;
    self.entries()?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> SyncResult<()> {
    self.check_writes()?;
    self.entries()?.remove(key);
    Ok(())
  }

  fn keys(&self) -> SyncResult<Vec<String>> {
    self.check_reads()?;
    Ok(self.entries()?.keys().cloned().collect())
  }
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> SyncResult<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open (or create) the database at `path`.
  pub fn open_at(path: &Path) -> SyncResult<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| SyncError::Storage(format!("Failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      SyncError::Storage(format!(
        "Failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::with_connection(conn)
  }

  /// Open a private in-memory database.
  pub fn open_in_memory() -> SyncResult<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> SyncResult<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> SyncResult<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| SyncError::Storage("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("bfsync").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> SyncResult<()> {
    let conn = self.conn()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| SyncError::Storage(format!("Failed to run cache migrations: {}", e)))?;

    Ok(())
  }

  fn conn(&self) -> SyncResult<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| SyncError::Storage(format!("Lock poisoned: {}", e)))
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KvBackend for SqliteStorage {
  fn get(&self, key: &str) -> SyncResult<Option<String>> {
    let conn = self.conn()?;

    let value = conn
      .query_row(
        "SELECT value FROM kv_cache WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()?;

    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> SyncResult<()> {
    let conn = self.conn()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (key, value, stored_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| SyncError::Storage(format!("Failed to store {}: {}", key, e)))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> SyncResult<()> {
    let conn = self.conn()?;
    conn.execute("DELETE FROM kv_cache WHERE key = ?", params![key])?;
    Ok(())
  }

  fn keys(&self) -> SyncResult<Vec<String>> {
    let conn = self.conn()?;

    let mut stmt = conn.prepare("SELECT key FROM kv_cache ORDER BY key")?;
    let keys = stmt
      .query_map([], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;

    Ok(keys)
  }

  fn remove_many(&self, keys: &[String]) -> SyncResult<()> {
    let mut conn = self.conn()?;

    let tx = conn.transaction()?;
    {
      let mut stmt = tx.prepare("DELETE FROM kv_cache WHERE key = ?")?;
      for key in keys {
        stmt.execute(params![key])?;
      }
    }
    tx.commit()?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_set_get_remove() {
    let storage = SqliteStorage::open_in_memory().unwrap();

    assert_eq!(storage.get("a").unwrap(), None);
    storage.set("a", "1").unwrap();
    storage.set("a", "2").unwrap();
    assert_eq!(storage.get("a").unwrap(), Some("2".to_string()));

    storage.remove("a").unwrap();
    assert_eq!(storage.get("a").unwrap(), None);
    // Removing again is fine
    storage.remove("a").unwrap();
  }

  #[test]
  fn test_sqlite_keys_and_remove_many() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set("b", "x").unwrap();
    storage.set("a", "x").unwrap();
    storage.set("c", "x").unwrap();

    assert_eq!(storage.keys().unwrap(), vec!["a", "b", "c"]);

    storage
      .remove_many(&["a".to_string(), "c".to_string()])
      .unwrap();
    assert_eq!(storage.keys().unwrap(), vec!["b"]);
  }

  #[test]
  fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage.set("cache:manifest", "{}").unwrap();
    }

    let storage = SqliteStorage::open_at(&path).unwrap();
    assert_eq!(
      storage.get("cache:manifest").unwrap(),
      Some("{}".to_string())
    );
  }

  #[test]
  fn test_memory_failure_injection() {
    let storage = MemoryStorage::new();
    storage.set("k", "v").unwrap();

    storage.set_fail_reads(true);
    assert!(storage.get("k").is_err());
    assert!(storage.keys().is_err());

    storage.set_fail_reads(false);
    storage.set_fail_writes(true);
    assert!(storage.set("k", "w").is_err());
    assert!(storage.remove("k").is_err());
    assert_eq!(storage.get("k").unwrap(), Some("v".to_string()));
  }

  #[test]
  fn test_noop_always_misses() {
    let storage = NoopStorage;
    storage.set("k", "v").unwrap();
    assert_eq!(storage.get("k").unwrap(), None);
    assert!(storage.keys().unwrap().is_empty());
  }
}
