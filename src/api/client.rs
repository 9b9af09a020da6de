use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::config::Config;
use crate::error::{Error, Result};

/// REST client for the backend.
///
/// Stateless apart from the base URL: every call builds one request, checks
/// the status and decodes the body. Resource operations live in
/// `handlers.rs` and `messages.rs`.
pub struct ApiClient<T = ReqwestTransport> {
  transport: Arc<T>,
  base_url: Url,
}

impl<T> Clone for ApiClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      base_url: self.base_url.clone(),
    }
  }
}

impl ApiClient<ReqwestTransport> {
  pub fn new(config: &Config) -> color_eyre::Result<Self> {
    let base_url = config.base_url()?;
    let transport = ReqwestTransport::new(config.request_timeout())?;
    Ok(Self::with_transport(base_url, transport)?)
  }
}

impl<T: Transport> ApiClient<T> {
  pub fn with_transport(base_url: &str, transport: T) -> Result<Self, url::ParseError> {
    let base_url = Url::parse(base_url.trim_end_matches('/'))?;
    Ok(Self {
      transport: Arc::new(transport),
      base_url,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// `{base}{resource}/{segments...}`, each segment percent-encoded.
  pub(crate) fn endpoint(&self, resource: &str, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path
        .pop_if_empty()
        .extend(resource.split('/').filter(|s| !s.is_empty()))
        .extend(segments);
    }
    url
  }

  /// Send one request and decode a success body into `R`.
  ///
  /// `operation` is the message of the `RequestFailed` error raised for a
  /// non-2xx status or a missing response.
  pub(crate) async fn send<R: DeserializeOwned>(
    &self,
    method: Method,
    url: Url,
    body: Option<Value>,
    operation: &'static str,
  ) -> Result<R> {
    debug!(%method, %url, "sending request");

    let request = ApiRequest {
      method: method.clone(),
      url: url.clone(),
      body,
    };
    let response = self.transport.send(request).await.map_err(|e| {
      warn!(%method, %url, error = %e, "{}", operation);
      Error::request_failed(operation, None)
    })?;

    if !response.is_success() {
      warn!(
        %method,
        %url,
        status = response.status,
        body = %String::from_utf8_lossy(&response.body),
        "{}",
        operation
      );
      return Err(Error::request_failed(operation, Some(response.status)));
    }

    decode(&response.body).map_err(|e| {
      warn!(%method, %url, error = %e, "{}: undecodable body", operation);
      Error::MalformedResponse { operation }
    })
  }
}

/// Serialize a write payload.
pub(crate) fn json_body(payload: &impl Serialize) -> Result<Value> {
  serde_json::to_value(payload).map_err(|e| Error::validation("body", e.to_string()))
}

/// Decode a body; an empty body decodes as JSON `null`.
fn decode<R: DeserializeOwned>(body: &[u8]) -> serde_json::Result<R> {
  if body.iter().all(u8::is_ascii_whitespace) {
    serde_json::from_value(Value::Null)
  } else {
    serde_json::from_slice(body)
  }
}

#[cfg(test)]
mod tests {
  use super::super::testing::FakeTransport;
  use super::*;
  use serde_json::json;

  #[test]
  fn test_network_client_needs_base_url() {
    let err = ApiClient::new(&Config::from_base_url("")).err().unwrap();
    assert!(err.to_string().contains("No API base URL configured"));
  }

  #[test]
  fn test_endpoint_joins_base_and_segments() {
    let fake = FakeTransport::default();
    let client = fake.client();
    assert_eq!(
      client.endpoint("/api/handlers", &[]).as_str(),
      "http://api.test/api/handlers"
    );
    assert_eq!(
      client.endpoint("/api/messages", &["chat", "12", "read-all"]).as_str(),
      "http://api.test/api/messages/chat/12/read-all"
    );
  }

  #[test]
  fn test_endpoint_keeps_base_path_and_encodes_segments() {
    let client = ApiClient::with_transport("https://host/v2/", FakeTransport::default()).unwrap();
    assert_eq!(
      client.endpoint("/api/messages", &["a b/c"]).as_str(),
      "https://host/v2/api/messages/a%20b%2Fc"
    );
  }

  #[tokio::test]
  async fn test_success_returns_body_unchanged() {
    let fake = FakeTransport::default();
    let payload = json!([{"id": 1, "anything": {"nested": true}}]);
    fake.reply(Method::GET, "/api/things", 200, payload.clone());

    let client = fake.client();
    let body: Value = client
      .send(Method::GET, client.endpoint("/api/things", &[]), None, "Failed to fetch things")
      .await
      .unwrap();
    assert_eq!(body, payload);
  }

  #[tokio::test]
  async fn test_non_success_status_is_request_failed() {
    let fake = FakeTransport::default();
    fake.reply(Method::GET, "/api/things", 503, json!({"error": "db down"}));

    let client = fake.client();
    let err = client
      .send::<Value>(Method::GET, client.endpoint("/api/things", &[]), None, "Failed to fetch things")
      .await
      .unwrap_err();
    assert_eq!(err, Error::request_failed("Failed to fetch things", Some(503)));
    assert_eq!(err.to_string(), "Failed to fetch things");
  }

  #[tokio::test]
  async fn test_no_response_is_request_failed_without_status() {
    let fake = FakeTransport::default();
    fake.unreachable(Method::DELETE, "/api/things/1");

    let client = fake.client();
    let err = client
      .send::<Value>(
        Method::DELETE,
        client.endpoint("/api/things", &["1"]),
        None,
        "Failed to delete thing",
      )
      .await
      .unwrap_err();
    assert!(err.is_network_failure());
    assert_eq!(err.to_string(), "Failed to delete thing");
  }

  #[tokio::test]
  async fn test_undecodable_body_is_malformed_response() {
    let fake = FakeTransport::default();
    fake.reply_raw(Method::GET, "/api/things", 200, "<html>");

    let client = fake.client();
    let err = client
      .send::<Value>(Method::GET, client.endpoint("/api/things", &[]), None, "Failed to fetch things")
      .await
      .unwrap_err();
    assert_eq!(
      err,
      Error::MalformedResponse {
        operation: "Failed to fetch things"
      }
    );
  }

  #[tokio::test]
  async fn test_empty_body_decodes_as_null() {
    let fake = FakeTransport::default();
    fake.reply_raw(Method::DELETE, "/api/things/1", 204, "");

    let client = fake.client();
    let body: Value = client
      .send(Method::DELETE, client.endpoint("/api/things", &["1"]), None, "Failed to delete thing")
      .await
      .unwrap();
    assert_eq!(body, Value::Null);
  }
}
