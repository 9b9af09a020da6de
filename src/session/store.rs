//! Key-value storage backends for the session cache.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// String key-value store the session is persisted in.
pub trait KeyValueStore: Send + Sync {
  fn get_item(&self, key: &str) -> Result<Option<String>>;

  fn set_item(&self, key: &str, value: &str) -> Result<()>;

  /// Removing a missing key is not an error.
  fn remove_item(&self, key: &str) -> Result<()>;
}

/// Process-local store, lost on exit.
#[derive(Default)]
pub struct MemoryStore {
  items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let items = self.items.lock().map_err(|e| Error::storage("read", e))?;
    Ok(items.get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let mut items = self.items.lock().map_err(|e| Error::storage("write", e))?;
    items.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let mut items = self.items.lock().map_err(|e| Error::storage("remove", e))?;
    items.remove(key);
    Ok(())
  }
}

/// SQLite-backed store that survives restarts.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| Error::storage("open", e))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::storage("open", format!("{}: {}", path.display(), e))
    })?;
    Self::with_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory().map_err(|e| Error::storage("open", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| Error::storage("migrate", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self, action: &'static str) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| Error::storage(action, e))
  }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStore {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn("read")?;
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| Error::storage("read", e))
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.conn("write")?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| Error::storage("write", e))?;
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let conn = self.conn("remove")?;
    conn
      .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
      .map_err(|e| Error::storage("remove", e))?;
    Ok(())
  }
}
