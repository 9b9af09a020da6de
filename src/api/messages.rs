//! Message endpoints under `/api/messages`.

use reqwest::Method;
use serde_json::Value;

use super::client::{json_body, ApiClient};
use super::transport::Transport;
use super::types::{Message, MessageInput, RecordId};
use crate::error::Result;

const MESSAGES: &str = "/api/messages";

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

impl<T: Transport> ApiClient<T> {
  /// GET /api/messages
  pub async fn get_messages(&self) -> Result<Vec<Message>> {
    let url = self.endpoint(MESSAGES, &[]);
    self
      .send(Method::GET, url, None, "Failed to fetch messages")
      .await
  }

  /// GET /api/messages/{id}
  pub async fn get_message_by_id(&self, id: &RecordId) -> Result<Message> {
    let id = id.to_string();
    let url = self.endpoint(MESSAGES, &[&id]);
    self
      .send(Method::GET, url, None, "Failed to fetch message")
      .await
  }

  /// POST /api/messages
  pub async fn create_message(&self, input: &MessageInput) -> Result<Message> {
    input.validate_for_create()?;
    let url = self.endpoint(MESSAGES, &[]);
    self
      .send(Method::POST, url, Some(json_body(input)?), "Failed to create message")
      .await
  }

  /// PUT /api/messages/{id} (full replace)
  pub async fn update_message(&self, id: &RecordId, input: &MessageInput) -> Result<Message> {
    input.validate()?;
    let id = id.to_string();
    let url = self.endpoint(MESSAGES, &[&id]);
    self
      .send(Method::PUT, url, Some(json_body(input)?), "Failed to update message")
      .await
  }

  /// PATCH /api/messages/{id} with only the fields that changed
  pub async fn patch_message(&self, id: &RecordId, patch: &MessageInput) -> Result<Message> {
    patch.validate()?;
    let id = id.to_string();
    let url = self.endpoint(MESSAGES, &[&id]);
    self
      .send(Method::PATCH, url, Some(json_body(patch)?), "Failed to patch message")
      .await
  }

  /// DELETE /api/messages/{id}
  pub async fn delete_message(&self, id: &RecordId) -> Result<Value> {
    let id = id.to_string();
    let url = self.endpoint(MESSAGES, &[&id]);
    self
      .send(Method::DELETE, url, None, "Failed to delete message")
      .await
  }

  /// GET /api/messages/chat/{chatId}
  pub async fn get_messages_by_chat_id(&self, chat_id: &RecordId) -> Result<Vec<Message>> {
    let chat_id = chat_id.to_string();
    let url = self.endpoint(MESSAGES, &["chat", &chat_id]);
    self
      .send(Method::GET, url, None, "Failed to fetch messages by chatId")
      .await
  }

  /// GET /api/messages/request/{requestId}
  pub async fn get_messages_by_request_id(&self, request_id: &RecordId) -> Result<Vec<Message>> {
    let request_id = request_id.to_string();
    let url = self.endpoint(MESSAGES, &["request", &request_id]);
    self
      .send(Method::GET, url, None, "Failed to fetch messages by requestId")
      .await
  }

  /// GET /api/messages/sender/{senderId}
  pub async fn get_messages_by_sender_id(&self, sender_id: &RecordId) -> Result<Vec<Message>> {
    let sender_id = sender_id.to_string();
    let url = self.endpoint(MESSAGES, &["sender", &sender_id]);
    self
      .send(Method::GET, url, None, "Failed to fetch messages by senderId")
      .await
  }

  /// GET /api/messages/status/{isRead}, with `isRead` rendered as `true`/`false`
  pub async fn get_messages_by_read_status(&self, is_read: bool) -> Result<Vec<Message>> {
    let is_read = is_read.to_string();
    let url = self.endpoint(MESSAGES, &["status", &is_read]);
    self
      .send(Method::GET, url, None, "Failed to fetch messages by read status")
      .await
  }

  /// GET /api/messages/chat/{chatId}/unread
  pub async fn get_unread_messages_in_chat(&self, chat_id: &RecordId) -> Result<Vec<Message>> {
    let chat_id = chat_id.to_string();
    let url = self.endpoint(MESSAGES, &["chat", &chat_id, "unread"]);
    self
      .send(Method::GET, url, None, "Failed to fetch unread messages in chat")
      .await
  }

  /// GET /api/messages/request/{requestId}/unread
  pub async fn get_unread_messages_in_request(
    &self,
    request_id: &RecordId,
  ) -> Result<Vec<Message>> {
    let request_id = request_id.to_string();
    let url = self.endpoint(MESSAGES, &["request", &request_id, "unread"]);
    self
      .send(Method::GET, url, None, "Failed to fetch unread messages in request")
      .await
  }

  /// PATCH /api/messages/{id}/read (no body)
  pub async fn mark_message_as_read(&self, id: &RecordId) -> Result<Value> {
    let id = id.to_string();
    let url = self.endpoint(MESSAGES, &[&id, "read"]);
    self
      .send(Method::PATCH, url, None, "Failed to mark message as read")
      .await
  }

  /// PATCH /api/messages/chat/{chatId}/read-all (no body)
  pub async fn mark_all_messages_as_read_in_chat(&self, chat_id: &RecordId) -> Result<Value> {
    let chat_id = chat_id.to_string();
    let url = self.endpoint(MESSAGES, &["chat", &chat_id, "read-all"]);
    self
      .send(Method::PATCH, url, None, "Failed to mark all messages as read in chat")
      .await
  }

  /// PATCH /api/messages/request/{requestId}/read-all (no body)
  pub async fn mark_all_messages_as_read_in_request(&self, request_id: &RecordId) -> Result<Value> {
    let request_id = request_id.to_string();
    let url = self.endpoint(MESSAGES, &["request", &request_id, "read-all"]);
    self
      .send(
        Method::PATCH,
        url,
        None,
        "Failed to mark all messages as read in request",
      )
      .await
  }

  /// GET /api/messages/chat/{chatId}/paginated?limit=&lastDate=
  ///
  /// `limit` defaults to 20. `lastDate` is the cursor from the previous page
  /// and is left out of the query entirely when `None`.
  pub async fn get_paginated_messages(
    &self,
    chat_id: &RecordId,
    limit: Option<u32>,
    last_date: Option<&str>,
  ) -> Result<Vec<Message>> {
    let url = self.paginated_messages_url(chat_id, limit, last_date);
    self
      .send(Method::GET, url, None, "Failed to fetch paginated messages")
      .await
  }

  fn paginated_messages_url(
    &self,
    chat_id: &RecordId,
    limit: Option<u32>,
    last_date: Option<&str>,
  ) -> url::Url {
    let chat_id = chat_id.to_string();
    let mut url = self.endpoint(MESSAGES, &["chat", &chat_id, "paginated"]);
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("limit", &limit.unwrap_or(DEFAULT_PAGE_LIMIT).to_string());
      if let Some(last_date) = page_cursor(last_date) {
        query.append_pair("lastDate", last_date);
      }
    }
    url
  }
}

/// A blank cursor means "first page", same as no cursor.
pub(crate) fn page_cursor(last_date: Option<&str>) -> Option<&str> {
  last_date.filter(|d| !d.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::super::testing::FakeTransport;
  use super::*;
  use serde_json::json;

  fn message_json(id: i64, chat_id: i64, is_read: bool) -> Value {
    json!({"id": id, "chatId": chat_id, "content": "hi", "isRead": is_read})
  }

  #[tokio::test]
  async fn test_paginated_url_without_cursor() {
    let fake = FakeTransport::default();
    fake.reply(
      Method::GET,
      "/api/messages/chat/5/paginated",
      200,
      json!([message_json(1, 5, false)]),
    );
    let client = fake.client();

    let page = client
      .get_paginated_messages(&RecordId::Int(5), Some(10), None)
      .await
      .unwrap();
    assert_eq!(page.len(), 1);

    let url = fake.last_request().url;
    assert_eq!(url.query(), Some("limit=10"));
    assert!(!url.as_str().contains("lastDate"));
  }

  #[tokio::test]
  async fn test_paginated_url_with_cursor_and_default_limit() {
    let fake = FakeTransport::default();
    let client = fake.client();
    let chat = RecordId::Int(5);

    let url = client.paginated_messages_url(&chat, Some(10), Some("2024-01-01"));
    assert_eq!(
      url.as_str(),
      "http://api.test/api/messages/chat/5/paginated?limit=10&lastDate=2024-01-01"
    );

    let url = client.paginated_messages_url(&chat, None, None);
    assert_eq!(url.query(), Some("limit=20"));
  }

  #[tokio::test]
  async fn test_blank_cursor_is_left_out() {
    let fake = FakeTransport::default();
    let client = fake.client();
    let chat = RecordId::Int(5);

    for blank in ["", "   "] {
      let url = client.paginated_messages_url(&chat, None, Some(blank));
      assert_eq!(url.query(), Some("limit=20"));
    }
  }

  #[tokio::test]
  async fn test_read_status_path_segment() {
    let fake = FakeTransport::default();
    fake.reply(Method::GET, "/api/messages/status/true", 200, json!([message_json(1, 1, true)]));
    fake.reply(Method::GET, "/api/messages/status/false", 200, json!([]));
    let client = fake.client();

    let read = client.get_messages_by_read_status(true).await.unwrap();
    assert_eq!(read[0].is_read, Some(true));
    assert!(client.get_messages_by_read_status(false).await.unwrap().is_empty());

    let paths: Vec<String> = fake
      .requests()
      .iter()
      .map(|r| r.url.path().to_string())
      .collect();
    assert_eq!(paths, ["/api/messages/status/true", "/api/messages/status/false"]);
  }

  #[tokio::test]
  async fn test_read_toggles_are_bodyless_patches() {
    let fake = FakeTransport::default();
    fake.reply(Method::PATCH, "/api/messages/3/read", 200, message_json(3, 1, true));
    fake.reply(Method::PATCH, "/api/messages/chat/1/read-all", 200, json!({"modified": 4}));
    fake.reply(Method::PATCH, "/api/messages/request/r7/read-all", 200, json!({"modified": 0}));
    let client = fake.client();

    client.mark_message_as_read(&RecordId::Int(3)).await.unwrap();
    let all = client
      .mark_all_messages_as_read_in_chat(&RecordId::Int(1))
      .await
      .unwrap();
    assert_eq!(all, json!({"modified": 4}));
    client
      .mark_all_messages_as_read_in_request(&RecordId::from("r7"))
      .await
      .unwrap();

    for request in fake.requests() {
      assert_eq!(request.method, Method::PATCH);
      assert_eq!(request.body, None);
    }
  }

  #[tokio::test]
  async fn test_scoped_reads_hit_their_paths() {
    let fake = FakeTransport::default();
    for path in [
      "/api/messages",
      "/api/messages/chat/1",
      "/api/messages/request/2",
      "/api/messages/sender/3",
      "/api/messages/chat/1/unread",
      "/api/messages/request/2/unread",
    ] {
      fake.reply(Method::GET, path, 200, json!([message_json(1, 1, false)]));
    }
    fake.reply(Method::GET, "/api/messages/4", 200, message_json(4, 1, false));
    let client = fake.client();

    client.get_messages().await.unwrap();
    client.get_messages_by_chat_id(&RecordId::Int(1)).await.unwrap();
    client.get_messages_by_request_id(&RecordId::Int(2)).await.unwrap();
    client.get_messages_by_sender_id(&RecordId::Int(3)).await.unwrap();
    client.get_unread_messages_in_chat(&RecordId::Int(1)).await.unwrap();
    client.get_unread_messages_in_request(&RecordId::Int(2)).await.unwrap();
    let one = client.get_message_by_id(&RecordId::Int(4)).await.unwrap();

    assert_eq!(one.id, RecordId::Int(4));
    assert_eq!(fake.requests().len(), 7);
    assert!(fake.requests().iter().all(|r| r.method == Method::GET));
  }

  #[tokio::test]
  async fn test_writes_use_their_methods() {
    let fake = FakeTransport::default();
    fake.reply(Method::POST, "/api/messages", 201, message_json(10, 1, false));
    fake.reply(Method::PUT, "/api/messages/10", 200, message_json(10, 1, false));
    fake.reply(Method::PATCH, "/api/messages/10", 200, message_json(10, 1, true));
    fake.reply_raw(Method::DELETE, "/api/messages/10", 204, "");
    let client = fake.client();
    let id = RecordId::Int(10);
    let input = MessageInput {
      chat_id: Some(RecordId::Int(1)),
      content: Some("hi".into()),
      ..Default::default()
    };

    client.create_message(&input).await.unwrap();
    client.update_message(&id, &input).await.unwrap();
    let patched = client
      .patch_message(
        &id,
        &MessageInput {
          is_read: Some(true),
          ..Default::default()
        },
      )
      .await
      .unwrap();
    assert_eq!(patched.is_read, Some(true));
    assert_eq!(client.delete_message(&id).await.unwrap(), Value::Null);

    let methods: Vec<Method> = fake.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, [Method::POST, Method::PUT, Method::PATCH, Method::DELETE]);
    assert_eq!(fake.requests()[2].body, Some(json!({"isRead": true})));
  }

  #[tokio::test]
  async fn test_failure_messages_per_operation() {
    let fake = FakeTransport::default();
    let client = fake.client();
    let id = RecordId::Int(1);

    // Nothing is routed, so every call gets a 404
    let cases = [
      (client.get_messages().await.unwrap_err(), "Failed to fetch messages"),
      (client.get_message_by_id(&id).await.unwrap_err(), "Failed to fetch message"),
      (
        client.get_messages_by_chat_id(&id).await.unwrap_err(),
        "Failed to fetch messages by chatId",
      ),
      (
        client.get_messages_by_request_id(&id).await.unwrap_err(),
        "Failed to fetch messages by requestId",
      ),
      (
        client.get_messages_by_sender_id(&id).await.unwrap_err(),
        "Failed to fetch messages by senderId",
      ),
      (
        client.get_messages_by_read_status(true).await.unwrap_err(),
        "Failed to fetch messages by read status",
      ),
      (
        client.get_unread_messages_in_chat(&id).await.unwrap_err(),
        "Failed to fetch unread messages in chat",
      ),
      (
        client.get_unread_messages_in_request(&id).await.unwrap_err(),
        "Failed to fetch unread messages in request",
      ),
      (
        client.mark_message_as_read(&id).await.unwrap_err(),
        "Failed to mark message as read",
      ),
      (
        client.mark_all_messages_as_read_in_chat(&id).await.unwrap_err(),
        "Failed to mark all messages as read in chat",
      ),
      (
        client.mark_all_messages_as_read_in_request(&id).await.unwrap_err(),
        "Failed to mark all messages as read in request",
      ),
      (
        client.get_paginated_messages(&id, None, None).await.unwrap_err(),
        "Failed to fetch paginated messages",
      ),
      (client.delete_message(&id).await.unwrap_err(), "Failed to delete message"),
    ];

    for (err, expected) in cases {
      assert_eq!(err.to_string(), expected);
      assert_eq!(err.status(), Some(404));
    }
  }

  #[tokio::test]
  async fn test_unreachable_server_has_no_status() {
    let fake = FakeTransport::default();
    fake.unreachable(Method::GET, "/api/messages/chat/1");
    let client = fake.client();

    let err = client
      .get_messages_by_chat_id(&RecordId::Int(1))
      .await
      .unwrap_err();
    assert!(err.is_network_failure());
    assert_eq!(err.to_string(), "Failed to fetch messages by chatId");
  }
}
