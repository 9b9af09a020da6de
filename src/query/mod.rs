//! Async query abstraction for data fetching with a shared cache.
//!
//! Inspired by TanStack Query. A [`QueryClient`] owns the cache; a
//! [`Query<T>`] observes one key of it from a view, and a [`Mutation`] runs a
//! write and invalidates the keys it declares.
//!
//! # Example
//!
//! ```ignore
//! let queries = QueryClient::new();
//! let api = api_client.clone();
//! let mut query = Query::new(&queries, ["handlers", "list"], move || {
//!     let api = api.clone();
//!     async move { api.get_handlers().await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

mod client;
mod key;
mod mutation;

pub use client::QueryClient;
pub use key::QueryKey;
pub use mutation::{Mutation, MutationState};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(Error),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&Error> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Observer of one cache key.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure), routed through the shared [`QueryClient`]
///   so observers of the same key never fetch twice at once
/// - Loading/success/error states
/// - Async result handling via channels
/// - Refetching after the key is invalidated by a mutation
///
/// While a Query is alive its cache entry is kept; dropping the last
/// observer of a key evicts the entry.
pub struct Query<T> {
  client: QueryClient,
  key: QueryKey,
  state: QueryState<Arc<T>>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create a new query observing `key` with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It is only called when
  /// the cache has no fresh value for `key` and nobody else is fetching it.
  ///
  /// # Example
  ///
  /// ```ignore
  /// let api = api_client.clone();
  /// let query = Query::new(&queries, ["messages", "chat", "42"], move || {
  ///     let api = api.clone();
  ///     async move { api.get_messages_by_chat_id(&"42".into()).await }
  /// });
  /// ```
  pub fn new<F, Fut>(client: &QueryClient, key: impl Into<QueryKey>, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let key = key.into();
    client.retain(&key);
    let fetcher: FetcherFn<T> = Arc::new(move || -> BoxFuture<T> { Box::pin(fetcher()) });

    Self {
      client: client.clone(),
      key,
      state: QueryState::Idle,
      fetcher,
      receiver: None,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<Arc<T>> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data().map(Arc::as_ref)
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query succeeded.
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error if the query failed.
  pub fn error(&self) -> Option<&Error> {
    self.state.error()
  }

  /// Check if the data on screen is stale: invalidated, or older than the
  /// client's stale time.
  pub fn is_stale(&self) -> bool {
    self.state.is_success() && self.client.is_stale(&self.key)
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading. A fresh cached value
  /// resolves without a network call.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch: invalidate this key (not keys nested under it), then fetch.
  ///
  /// If another observer's fetch of this key is already in flight, this
  /// joins it, and `poll` fetches once more when that result arrives
  /// outdated.
  pub fn refetch(&mut self) {
    self.client.invalidate_key(&self.key);
    // Drop any pending result; the new one supersedes it
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived, error occurred, or
  /// an invalidation started a refetch). Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let changed = self.poll_receiver();

    // Data on screen was invalidated after it arrived; fetch it again
    if self.state.is_success() && self.client.is_invalidated(&self.key) {
      self.start_fetch();
      return true;
    }

    changed
  }

  fn poll_receiver(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error(Error::Cancelled("Query"));
        self.receiver = None;
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let client = self.client.clone();
    let key = self.key.clone();
    let fetcher = Arc::clone(&self.fetcher);
    tokio::spawn(async move {
      let result = client.fetch_query(key, move || fetcher()).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    self.client.release(&self.key);
  }
}

// Query is not Clone: each instance counts as one observer of its key.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
