//! Handler endpoints under `/api/handlers`.

use reqwest::Method;
use serde_json::Value;

use super::client::{json_body, ApiClient};
use super::transport::Transport;
use super::types::{Handler, HandlerInput, RecordId};
use crate::error::Result;

const HANDLERS: &str = "/api/handlers";

impl<T: Transport> ApiClient<T> {
  /// GET /api/handlers
  pub async fn get_handlers(&self) -> Result<Vec<Handler>> {
    let url = self.endpoint(HANDLERS, &[]);
    self
      .send(Method::GET, url, None, "Failed to fetch handlers")
      .await
  }

  /// GET /api/handlers/logistics-handlers
  pub async fn get_logistics_handlers(&self) -> Result<Vec<Handler>> {
    let url = self.endpoint(HANDLERS, &["logistics-handlers"]);
    self
      .send(Method::GET, url, None, "Failed to fetch logistics handlers")
      .await
  }

  /// GET /api/handlers/complaints-handlers
  pub async fn get_complaints_handlers(&self) -> Result<Vec<Handler>> {
    let url = self.endpoint(HANDLERS, &["complaints-handlers"]);
    self
      .send(Method::GET, url, None, "Failed to fetch complaints handlers")
      .await
  }

  /// POST /api/handlers
  pub async fn create_handler(&self, input: &HandlerInput) -> Result<Handler> {
    input.validate_for_create()?;
    let url = self.endpoint(HANDLERS, &[]);
    self
      .send(Method::POST, url, Some(json_body(input)?), "Failed to create handler")
      .await
  }

  /// PUT /api/handlers/{id}
  pub async fn update_handler(&self, id: &RecordId, input: &HandlerInput) -> Result<Handler> {
    input.validate()?;
    let id = id.to_string();
    let url = self.endpoint(HANDLERS, &[&id]);
    self
      .send(Method::PUT, url, Some(json_body(input)?), "Failed to update handler")
      .await
  }

  /// DELETE /api/handlers/{id}
  ///
  /// Returns whatever the backend sends back (often `null` for an empty body).
  pub async fn delete_handler(&self, id: &RecordId) -> Result<Value> {
    let id = id.to_string();
    let url = self.endpoint(HANDLERS, &[&id]);
    self
      .send(Method::DELETE, url, None, "Failed to delete handler")
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::super::testing::FakeTransport;
  use super::*;
  use crate::Error;
  use serde_json::json;

  fn handler_json(id: i64, name: &str, role: &str) -> Value {
    json!({"id": id, "name": name, "role": role})
  }

  #[tokio::test]
  async fn test_list_endpoints() {
    let fake = FakeTransport::default();
    fake.reply(
      Method::GET,
      "/api/handlers",
      200,
      json!([handler_json(1, "A", "logistics"), handler_json(2, "B", "complaints")]),
    );
    fake.reply(
      Method::GET,
      "/api/handlers/logistics-handlers",
      200,
      json!([handler_json(1, "A", "logistics")]),
    );
    fake.reply(
      Method::GET,
      "/api/handlers/complaints-handlers",
      200,
      json!([handler_json(2, "B", "complaints")]),
    );
    let client = fake.client();

    let all = client.get_handlers().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].name.as_deref(), Some("B"));

    let logistics = client.get_logistics_handlers().await.unwrap();
    assert_eq!(logistics[0].id, RecordId::Int(1));

    let complaints = client.get_complaints_handlers().await.unwrap();
    assert_eq!(complaints[0].role.as_deref(), Some("complaints"));

    assert_eq!(fake.requests().len(), 3);
  }

  #[tokio::test]
  async fn test_failure_messages_per_operation() {
    let fake = FakeTransport::default();
    for path in [
      "/api/handlers",
      "/api/handlers/logistics-handlers",
      "/api/handlers/complaints-handlers",
    ] {
      fake.reply(Method::GET, path, 500, json!({"message": "boom"}));
    }
    fake.reply(Method::POST, "/api/handlers", 400, json!({}));
    fake.reply(Method::PUT, "/api/handlers/5", 404, json!({}));
    fake.reply(Method::DELETE, "/api/handlers/5", 404, json!({}));
    let client = fake.client();
    let input = HandlerInput {
      name: Some("C".into()),
      ..Default::default()
    };
    let id = RecordId::Int(5);

    let messages = [
      client.get_handlers().await.unwrap_err().to_string(),
      client.get_logistics_handlers().await.unwrap_err().to_string(),
      client.get_complaints_handlers().await.unwrap_err().to_string(),
      client.create_handler(&input).await.unwrap_err().to_string(),
      client.update_handler(&id, &input).await.unwrap_err().to_string(),
      client.delete_handler(&id).await.unwrap_err().to_string(),
    ];
    assert_eq!(
      messages,
      [
        "Failed to fetch handlers",
        "Failed to fetch logistics handlers",
        "Failed to fetch complaints handlers",
        "Failed to create handler",
        "Failed to update handler",
        "Failed to delete handler",
      ]
    );
  }

  #[tokio::test]
  async fn test_create_sends_body_verbatim() {
    let fake = FakeTransport::default();
    fake.reply(Method::POST, "/api/handlers", 201, handler_json(9, "Dev", "logistics"));
    let client = fake.client();

    let mut input = HandlerInput {
      name: Some("Dev".into()),
      role: Some("logistics".into()),
      ..Default::default()
    };
    input.extra.insert("zone".into(), json!("east"));

    let created = client.create_handler(&input).await.unwrap();
    assert_eq!(created.id, RecordId::Int(9));

    let request = fake.last_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(
      request.body,
      Some(json!({"name": "Dev", "role": "logistics", "zone": "east"}))
    );
  }

  #[tokio::test]
  async fn test_update_and_delete_address_the_id() {
    let fake = FakeTransport::default();
    fake.reply(Method::PUT, "/api/handlers/abc123", 200, json!({"id": "abc123", "name": "E"}));
    fake.reply_raw(Method::DELETE, "/api/handlers/abc123", 200, r#"{"deleted":true}"#);
    let client = fake.client();
    let id = RecordId::from("abc123");

    let updated = client
      .update_handler(
        &id,
        &HandlerInput {
          name: Some("E".into()),
          ..Default::default()
        },
      )
      .await
      .unwrap();
    assert_eq!(updated.name.as_deref(), Some("E"));
    assert_eq!(fake.requests()[0].method, Method::PUT);

    let deleted = client.delete_handler(&id).await.unwrap();
    assert_eq!(deleted, json!({"deleted": true}));
    assert_eq!(fake.last_request().body, None);
  }

  #[tokio::test]
  async fn test_invalid_input_never_reaches_the_network() {
    let fake = FakeTransport::default();
    let client = fake.client();

    let err = client
      .create_handler(&HandlerInput::default())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed { field: "name", .. }));

    let err = client
      .update_handler(
        &RecordId::Int(1),
        &HandlerInput {
          email: Some("nope".into()),
          ..Default::default()
        },
      )
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed { field: "email", .. }));

    assert!(fake.requests().is_empty());
  }
}
