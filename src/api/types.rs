//! Records exchanged with the backend.
//!
//! Known fields are typed and optional; anything else the backend sends is
//! kept in `extra` so responses round-trip without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::Result;
use crate::validate;

/// Backend identifier, numeric or string depending on the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
  Int(i64),
  Text(String),
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecordId::Int(id) => write!(f, "{}", id),
      RecordId::Text(id) => write!(f, "{}", id),
    }
  }
}

impl From<i64> for RecordId {
  fn from(id: i64) -> Self {
    RecordId::Int(id)
  }
}

impl From<&str> for RecordId {
  fn from(id: &str) -> Self {
    RecordId::Text(id.to_string())
  }
}

impl From<String> for RecordId {
  fn from(id: String) -> Self {
    RecordId::Text(id)
  }
}

impl std::str::FromStr for RecordId {
  type Err = std::convert::Infallible;

  /// Digits become `Int`, anything else stays text.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.parse::<i64>() {
      Ok(id) => RecordId::Int(id),
      Err(_) => RecordId::Text(s.to_string()),
    })
  }
}

// ============================================================================
// Handlers
// ============================================================================

/// Staff member who handles logistics or complaint requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
  pub id: RecordId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  /// e.g. "logistics" or "complaints"
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Body for creating or updating a handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl HandlerInput {
  /// Check the fields that are present.
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::required("name", name)?;
    }
    if let Some(email) = &self.email {
      validate::email(email)?;
    }
    if let Some(phone) = &self.phone {
      validate::phone(phone)?;
    }
    Ok(())
  }

  /// A new handler needs at least a name.
  pub fn validate_for_create(&self) -> Result<()> {
    validate::required("name", self.name.as_deref().unwrap_or_default())?;
    self.validate()
  }
}

// ============================================================================
// Messages
// ============================================================================

/// Chat message attached to a chat and/or a service request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id: RecordId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chat_id: Option<RecordId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_id: Option<RecordId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sender_id: Option<RecordId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_read: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Body for creating, replacing or patching a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInput {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chat_id: Option<RecordId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_id: Option<RecordId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sender_id: Option<RecordId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_read: Option<bool>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl MessageInput {
  pub fn validate(&self) -> Result<()> {
    if let Some(content) = &self.content {
      validate::required("content", content)?;
    }
    Ok(())
  }

  /// A new message needs content and somewhere to go.
  pub fn validate_for_create(&self) -> Result<()> {
    validate::required("content", self.content.as_deref().unwrap_or_default())?;
    if self.chat_id.is_none() && self.request_id.is_none() {
      return Err(crate::Error::validation(
        "chatId",
        "a message needs a chatId or a requestId",
      ));
    }
    Ok(())
  }
}
