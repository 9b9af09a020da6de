//! The signed-in user, persisted across restarts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::store::KeyValueStore;
use crate::api::RecordId;
use crate::error::{Error, Result};

/// Key the user record is stored under.
pub const SESSION_KEY: &str = "user";

/// Authenticated-user record as the backend returns it at login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
  pub id: RecordId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token: Option<String>,
  /// Fields this client does not interpret, kept so a write round-trips them
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl UserRecord {
  pub fn new(id: impl Into<RecordId>) -> Self {
    Self {
      id: id.into(),
      name: None,
      phone: None,
      email: None,
      role: None,
      token: None,
      extra: Map::new(),
    }
  }
}

/// Single-record session cache over a [`KeyValueStore`].
///
/// Nothing here returns an error. A failing store leaves the in-memory state
/// usable and sets [`SessionCache::error`]; the next successful operation
/// clears it. A stored value that no longer parses reads as signed out.
pub struct SessionCache<S> {
  store: S,
  user: Option<UserRecord>,
  error: Option<Error>,
}

impl<S: KeyValueStore> SessionCache<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      user: None,
      error: None,
    }
  }

  /// Load the record from the store.
  pub fn read(&mut self) -> Option<&UserRecord> {
    let loaded = self.store.get_item(SESSION_KEY);
    self.user = match self.settle(loaded) {
      Some(Some(raw)) => match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
          warn!(error = %e, "discarding unreadable session record");
          None
        }
      },
      _ => None,
    };
    self.user.as_ref()
  }

  /// Persist `record` and make it the current user.
  pub fn write(&mut self, record: UserRecord) {
    let stored = serde_json::to_string(&record)
      .map_err(|e| Error::storage("write", e))
      .and_then(|raw| self.store.set_item(SESSION_KEY, &raw));
    self.settle(stored);
    self.user = Some(record);
  }

  /// Forget the current user, in memory and in the store.
  pub fn clear(&mut self) {
    let removed = self.store.remove_item(SESSION_KEY);
    self.settle(removed);
    self.user = None;
  }

  /// The current user as of the last read, write or clear.
  pub fn user(&self) -> Option<&UserRecord> {
    self.user.as_ref()
  }

  /// Failure of the most recent storage operation, if it failed.
  pub fn error(&self) -> Option<&Error> {
    self.error.as_ref()
  }

  fn settle<T>(&mut self, result: Result<T>) -> Option<T> {
    match result {
      Ok(value) => {
        self.error = None;
        Some(value)
      }
      Err(e) => {
        warn!(error = %e, "session storage failed");
        self.error = Some(e);
        None
      }
    }
  }
}
