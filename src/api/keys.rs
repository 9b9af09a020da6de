//! Cache keys for backend reads.

use super::messages::page_cursor;
use super::types::RecordId;
use crate::query::QueryKey;

// ============================================================================
// Handlers
// ============================================================================

/// Query keys for handler reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerKey {
  /// Every handler
  All,
  /// Handlers assigned to logistics
  Logistics,
  /// Handlers assigned to complaints
  Complaints,
  /// One handler record
  Detail(RecordId),
}

impl HandlerKey {
  pub const RESOURCE: &'static str = "handlers";

  /// The three list keys a create or delete makes stale.
  pub fn lists() -> Vec<QueryKey> {
    vec![
      HandlerKey::All.into(),
      HandlerKey::Logistics.into(),
      HandlerKey::Complaints.into(),
    ]
  }

  /// Keys an update makes stale: the lists plus the record itself.
  pub fn after_update(id: &RecordId) -> Vec<QueryKey> {
    let mut keys = Self::lists();
    keys.push(HandlerKey::Detail(id.clone()).into());
    keys
  }
}

impl From<HandlerKey> for QueryKey {
  fn from(key: HandlerKey) -> Self {
    let base = QueryKey::new(HandlerKey::RESOURCE);
    match key {
      HandlerKey::All => base.with("list"),
      HandlerKey::Logistics => base.with("logistics"),
      HandlerKey::Complaints => base.with("complaints"),
      HandlerKey::Detail(id) => base.with("detail").with(id),
    }
  }
}

// ============================================================================
// Messages
// ============================================================================

/// Query keys for message reads.
///
/// Chat- and request-scoped keys nest under `["messages", "chat", id]` and
/// `["messages", "request", id]`, so invalidating that prefix reaches the
/// unread and paginated views of the same chat or request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKey {
  All,
  Detail(RecordId),
  Chat(RecordId),
  ChatUnread(RecordId),
  ChatPage {
    chat_id: RecordId,
    limit: u32,
    last_date: Option<String>,
  },
  Request(RecordId),
  RequestUnread(RecordId),
  Sender(RecordId),
  ReadStatus(bool),
}

impl MessageKey {
  pub const RESOURCE: &'static str = "messages";

  /// The whole message namespace; every message write invalidates it.
  pub fn namespace() -> QueryKey {
    QueryKey::new(Self::RESOURCE)
  }
}

impl From<MessageKey> for QueryKey {
  fn from(key: MessageKey) -> Self {
    let base = MessageKey::namespace();
    match key {
      MessageKey::All => base.with("list"),
      MessageKey::Detail(id) => base.with("detail").with(id),
      MessageKey::Chat(id) => base.with("chat").with(id),
      MessageKey::ChatUnread(id) => base.with("chat").with(id).with("unread"),
      MessageKey::ChatPage {
        chat_id,
        limit,
        last_date,
      } => base
        .with("chat")
        .with(chat_id)
        .with("paginated")
        .with(limit)
        .with(page_cursor(last_date.as_deref()).unwrap_or_default()),
      MessageKey::Request(id) => base.with("request").with(id),
      MessageKey::RequestUnread(id) => base.with("request").with(id).with("unread"),
      MessageKey::Sender(id) => base.with("sender").with(id),
      MessageKey::ReadStatus(is_read) => base.with("status").with(is_read),
    }
  }
}
