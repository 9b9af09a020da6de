//! Polled write operations that invalidate cache keys on success.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{QueryClient, QueryKey};
use crate::error::{Error, Result};

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<R> {
  /// Not started, or reset
  Idle,
  /// Request in flight
  Pending,
  /// Server confirmed the write
  Success(R),
  /// Write was rejected or never reached the server
  Error(Error),
}

impl<R> MutationState<R> {
  pub fn is_pending(&self) -> bool {
    matches!(self, MutationState::Pending)
  }

  pub fn data(&self) -> Option<&R> {
    match self {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&Error> {
    match self {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<R> = Pin<Box<dyn Future<Output = Result<R>> + Send>>;
type MutatorFn<I, R> = Arc<dyn Fn(I) -> BoxFuture<R> + Send + Sync>;
type InvalidatesFn<I> = Arc<dyn Fn(&I) -> Vec<QueryKey> + Send + Sync>;

/// A write bound to the cache keys it makes stale.
///
/// Each call to [`Mutation::mutate`] spawns the write and tracks it as the
/// pending mutation; `poll` picks up the outcome. Invalidation happens only
/// after the server confirms the write.
pub struct Mutation<I, R> {
  client: QueryClient,
  mutator: MutatorFn<I, R>,
  invalidates: InvalidatesFn<I>,
  state: MutationState<R>,
  receiver: Option<mpsc::UnboundedReceiver<Result<R>>>,
}

impl<I: Send + 'static, R: Send + 'static> Mutation<I, R> {
  pub fn new<F, Fut>(client: &QueryClient, mutator: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
  {
    let mutator: MutatorFn<I, R> =
      Arc::new(move |input: I| -> BoxFuture<R> { Box::pin(mutator(input)) });
    Self {
      client: client.clone(),
      mutator,
      invalidates: Arc::new(|_: &I| Vec::new()),
      state: MutationState::Idle,
      receiver: None,
    }
  }

  /// Invalidate a fixed set of key prefixes on success.
  pub fn invalidates(self, keys: Vec<QueryKey>) -> Self {
    self.invalidates_with(move |_| keys.clone())
  }

  /// Compute the prefixes to invalidate from the mutation input.
  pub fn invalidates_with<G>(mut self, keys: G) -> Self
  where
    G: Fn(&I) -> Vec<QueryKey> + Send + Sync + 'static,
  {
    self.invalidates = Arc::new(keys);
    self
  }

  pub fn state(&self) -> &MutationState<R> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    self.state.is_pending()
  }

  pub fn data(&self) -> Option<&R> {
    self.state.data()
  }

  pub fn error(&self) -> Option<&Error> {
    self.state.error()
  }

  /// Start the write. A previous pending write keeps running but its
  /// outcome is no longer reported here.
  pub fn mutate(&mut self, input: I) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    let client = self.client.clone();
    let keys = (self.invalidates)(&input);
    let write = (self.mutator)(input);
    tokio::spawn(async move {
      let result = client.mutate(&keys, write).await;
      let _ = tx.send(result);
    });
  }

  /// Poll for the outcome of a pending write. Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = MutationState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error(Error::Cancelled("Mutation"));
        self.receiver = None;
        true
      }
    }
  }

  /// Forget the last outcome.
  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = MutationState::Idle;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  async fn settle<I: Send + 'static, R: Send + 'static>(mutation: &mut Mutation<I, R>) {
    for _ in 0..100 {
      tokio::time::sleep(Duration::from_millis(2)).await;
      if mutation.poll() {
        return;
      }
    }
  }

  async fn seed(client: &QueryClient, key: &QueryKey) {
    client
      .fetch_query(key, || async { Ok(0u8) })
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_success_invalidates_declared_keys() {
    let client = QueryClient::new();
    let list = QueryKey::from(["handlers", "list"]);
    let detail = QueryKey::from(["handlers", "detail", "7"]);
    let unrelated = QueryKey::from(["handlers", "detail", "8"]);
    for key in [&list, &detail, &unrelated] {
      seed(&client, key).await;
    }

    let list_prefix = list.clone();
    let mut update = Mutation::new(&client, |id: u32| async move { Ok(id * 2) })
      .invalidates_with(move |id| {
        vec![
          list_prefix.clone(),
          QueryKey::from(["handlers", "detail"]).with(id),
        ]
      });

    assert!(matches!(update.state(), MutationState::Idle));
    update.mutate(7);
    assert!(update.is_pending());
    // Nothing changes before the server answers
    assert!(!client.is_stale(&list));

    settle(&mut update).await;
    assert_eq!(update.data(), Some(&14));
    assert!(client.is_stale(&list));
    assert!(client.is_stale(&detail));
    assert!(!client.is_stale(&unrelated));
  }

  #[tokio::test]
  async fn test_failure_leaves_cache_fresh() {
    let client = QueryClient::new();
    let list = QueryKey::from(["handlers", "list"]);
    seed(&client, &list).await;

    let mut delete: Mutation<u32, ()> = Mutation::new(&client, |_id| async {
      Err(Error::request_failed("Failed to delete handler", Some(404)))
    })
    .invalidates(vec![list.clone()]);

    delete.mutate(1);
    settle(&mut delete).await;

    assert_eq!(delete.error().and_then(Error::status), Some(404));
    assert!(!client.is_stale(&list));

    delete.reset();
    assert!(matches!(delete.state(), MutationState::Idle));
  }
}
