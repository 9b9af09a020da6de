//! HTTP transport seam.
//!
//! `ApiClient` talks to the network only through [`Transport`], so tests can
//! substitute a recording fake for reqwest.

use reqwest::Method;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  pub url: Url,
  /// JSON body, sent verbatim when present
  pub body: Option<Value>,
}

/// Raw response: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// The request produced no response at all.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends a single request. Implementations must not retry.
pub trait Transport: Send + Sync + 'static {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// Real transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  /// `timeout` of `None` leaves reqwest's default (no overall timeout).
  pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    Ok(Self {
      client: builder.build()?,
    })
  }
}

impl Transport for ReqwestTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
    let mut builder = self.client.request(request.method, request.url);
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| TransportError(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
      .bytes()
      .await
      .map_err(|e| TransportError(e.to_string()))?;
    trace!(status, bytes = body.len(), "received response");

    Ok(ApiResponse {
      status,
      body: body.to_vec(),
    })
  }
}
