//! Recording fake transport for unit tests.

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use super::client::ApiClient;
use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

pub(crate) const BASE_URL: &str = "http://api.test";

#[derive(Clone)]
enum Reply {
  Response(u16, Vec<u8>),
  Unreachable,
}

#[derive(Default)]
struct FakeState {
  routes: HashMap<(Method, String), Reply>,
  requests: Vec<ApiRequest>,
}

/// Answers by (method, path) and records every request. Unrouted requests get a 404.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
  state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
  pub fn client(&self) -> ApiClient<FakeTransport> {
    ApiClient::with_transport(BASE_URL, self.clone()).unwrap()
  }

  pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
    self.route(method, path, Reply::Response(status, body.to_string().into_bytes()));
  }

  pub fn reply_raw(&self, method: Method, path: &str, status: u16, body: &str) {
    self.route(method, path, Reply::Response(status, body.as_bytes().to_vec()));
  }

  pub fn unreachable(&self, method: Method, path: &str) {
    self.route(method, path, Reply::Unreachable);
  }

  fn route(&self, method: Method, path: &str, reply: Reply) {
    self
      .state
      .lock()
      .unwrap()
      .routes
      .insert((method, path.to_string()), reply);
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.state.lock().unwrap().requests.clone()
  }

  pub fn last_request(&self) -> ApiRequest {
    self.requests().pop().expect("no request was sent")
  }

  /// Number of requests sent to `path` with `method`, ignoring the query string.
  pub fn calls(&self, method: Method, path: &str) -> usize {
    self
      .state
      .lock()
      .unwrap()
      .requests
      .iter()
      .filter(|r| r.method == method && r.url.path() == path)
      .count()
  }
}

impl Transport for FakeTransport {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
    let reply = {
      let mut state = self.state.lock().unwrap();
      let reply = state
        .routes
        .get(&(request.method.clone(), request.url.path().to_string()))
        .cloned();
      state.requests.push(request);
      reply
    };

    async move {
      match reply {
        Some(Reply::Response(status, body)) => Ok(ApiResponse { status, body }),
        Some(Reply::Unreachable) => Err(TransportError("connection refused".to_string())),
        None => Ok(ApiResponse {
          status: 404,
          body: Vec::new(),
        }),
      }
    }
  }
}
