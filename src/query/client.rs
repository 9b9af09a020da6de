//! Shared query cache with request deduplication and prefix invalidation.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::key::QueryKey;
use crate::error::{Error, Result};

type CachedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue>>>;

/// One cache slot.
#[derive(Default)]
struct CacheEntry {
  /// Last successful payload
  data: Option<CachedValue>,
  updated_at: Option<DateTime<Utc>>,
  /// Set by invalidation, cleared by a fetch that started after it
  invalidated: bool,
  /// Error from the most recent fetch, if it failed
  error: Option<Error>,
  /// Number of live `Query` observers
  observers: usize,
  in_flight: Option<(u64, SharedFetch)>,
}

impl CacheEntry {
  fn mark_invalidated(&mut self, key: &QueryKey) {
    self.invalidated = true;
    if self.in_flight.take().is_some() {
      debug!(%key, "detached outdated fetch");
    }
  }

  fn fresh_data(&self, stale_time: Option<Duration>) -> Option<CachedValue> {
    if self.invalidated {
      return None;
    }
    if let (Some(stale_time), Some(updated_at)) = (stale_time, self.updated_at) {
      if Utc::now() - updated_at > stale_time {
        return None;
      }
    }
    self.data.clone()
  }
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, CacheEntry>,
  stale_time: Option<Duration>,
  next_fetch_id: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
  // Nothing panics while holding the lock, but a poisoned cache is still usable.
  inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: CachedValue) -> Result<Arc<T>> {
  value
    .downcast::<T>()
    .map_err(|_| Error::TypeMismatch {
      key: key.to_string(),
    })
}

enum Lookup {
  Hit(CachedValue),
  Pending(SharedFetch),
  Miss,
}

/// Query cache shared by every consumer of the data-access layer.
///
/// Construct one per application (or per test) and hand out clones; clones
/// share the same cache. Reads are keyed by [`QueryKey`]:
/// - a fresh entry is served without a network call
/// - a missing or stale entry triggers one fetch, and every concurrent reader
///   of that key awaits the same fetch
/// - a successful mutation marks every entry under its declared prefixes stale
///
/// Fetches run as spawned tasks, so callers must be inside a Tokio runtime.
/// A caller that stops waiting does not cancel the request.
#[derive(Clone, Default)]
pub struct QueryClient {
  inner: Arc<Mutex<Inner>>,
}

impl QueryClient {
  pub fn new() -> Self {
    Self::default()
  }

  /// Treat entries older than `stale_time` as stale even without invalidation.
  pub fn with_stale_time(self, stale_time: Duration) -> Self {
    lock(&self.inner).stale_time = Some(stale_time);
    self
  }

  /// Read a key, fetching it if there is no fresh cached value.
  ///
  /// `fetcher` is only called when no fresh value and no in-flight fetch
  /// exist for `key`.
  pub async fn fetch_query<T, F, Fut>(&self, key: impl Into<QueryKey>, fetcher: F) -> Result<Arc<T>>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let key = key.into();

    let pending = match self.lookup(&key) {
      Lookup::Hit(value) => {
        debug!(%key, "query cache hit");
        return downcast(&key, value);
      }
      Lookup::Pending(pending) => {
        debug!(%key, "joining in-flight fetch");
        pending
      }
      Lookup::Miss => self.start_fetch(&key, fetcher()),
    };

    let value = pending.await?;
    downcast(&key, value)
  }

  fn lookup(&self, key: &QueryKey) -> Lookup {
    let inner = lock(&self.inner);
    let Some(entry) = inner.entries.get(key) else {
      return Lookup::Miss;
    };
    if let Some(value) = entry.fresh_data(inner.stale_time) {
      return Lookup::Hit(value);
    }
    match &entry.in_flight {
      Some((_, pending)) => Lookup::Pending(pending.clone()),
      None => Lookup::Miss,
    }
  }

  /// Register a fetch for `key`, or join the one another reader registered
  /// since `lookup` released the lock. An unused `fut` is dropped unpolled.
  fn start_fetch<T, Fut>(&self, key: &QueryKey, fut: Fut) -> SharedFetch
  where
    T: Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let mut inner = lock(&self.inner);
    let fetch_id = inner.next_fetch_id;
    let entry = inner.entries.entry(key.clone()).or_default();

    if let Some((_, pending)) = &entry.in_flight {
      return pending.clone();
    }

    let cache = Arc::clone(&self.inner);
    let settle_key = key.clone();
    let pending = async move {
      let result = fut.await.map(|value| Arc::new(value) as CachedValue);
      settle(&cache, &settle_key, fetch_id, &result);
      result
    }
    .boxed()
    .shared();

    entry.in_flight = Some((fetch_id, pending.clone()));
    inner.next_fetch_id += 1;
    debug!(%key, fetch_id, "starting fetch");

    // Drive the fetch to completion even if every reader goes away
    tokio::spawn(pending.clone());

    pending
  }

  /// Run a mutation; on success mark every entry under `invalidates` stale.
  ///
  /// Nothing in the cache changes until the mutation resolves, and a failed
  /// mutation invalidates nothing.
  pub async fn mutate<R, Fut>(&self, invalidates: &[QueryKey], mutation: Fut) -> Result<R>
  where
    Fut: Future<Output = Result<R>>,
  {
    let result = mutation.await;
    match &result {
      Ok(_) => {
        self.invalidate_all(invalidates);
      }
      Err(e) => debug!(error = %e, "mutation failed, cache untouched"),
    }
    result
  }

  /// Mark every entry whose key starts with `prefix` as stale.
  ///
  /// A fetch still in flight for an affected key is detached: readers already
  /// waiting on it get its result, but the result is not cached and the next
  /// reader starts a fresh fetch.
  ///
  /// Returns the number of entries affected.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut inner = lock(&self.inner);
    let mut count = 0;
    for (key, entry) in inner
      .entries
      .iter_mut()
      .filter(|(key, _)| key.starts_with(prefix))
    {
      entry.mark_invalidated(key);
      count += 1;
    }
    info!(%prefix, count, "invalidated queries");
    count
  }

  /// Mark only `key` stale, leaving keys nested under it alone.
  pub fn invalidate_key(&self, key: &QueryKey) -> bool {
    let mut inner = lock(&self.inner);
    let Some(entry) = inner.entries.get_mut(key) else {
      return false;
    };
    entry.mark_invalidated(key);
    debug!(%key, "invalidated query");
    true
  }

  /// Invalidate several prefixes at once.
  pub fn invalidate_all(&self, prefixes: &[QueryKey]) -> usize {
    prefixes.iter().map(|prefix| self.invalidate(prefix)).sum()
  }

  /// Drop every entry whose key starts with `prefix`.
  ///
  /// Results of fetches already in flight for removed keys are discarded.
  pub fn remove(&self, prefix: &QueryKey) -> usize {
    let mut inner = lock(&self.inner);
    let before = inner.entries.len();
    inner.entries.retain(|key, _| !key.starts_with(prefix));
    before - inner.entries.len()
  }

  pub fn clear(&self) {
    lock(&self.inner).entries.clear();
  }

  /// Evict entries nobody observes and nothing is fetching.
  pub fn gc(&self) -> usize {
    let mut inner = lock(&self.inner);
    let before = inner.entries.len();
    inner
      .entries
      .retain(|_, entry| entry.observers > 0 || entry.in_flight.is_some());
    let evicted = before - inner.entries.len();
    if evicted > 0 {
      debug!(evicted, "evicted unobserved queries");
    }
    evicted
  }

  /// Last successful value for `key`, fresh or not.
  pub fn get_cached<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
    let value = lock(&self.inner).entries.get(key)?.data.clone()?;
    downcast(key, value).ok()
  }

  /// Error from the latest fetch of `key`, if it failed.
  pub fn error(&self, key: &QueryKey) -> Option<Error> {
    lock(&self.inner).entries.get(key)?.error.clone()
  }

  pub fn updated_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
    lock(&self.inner).entries.get(key)?.updated_at
  }

  /// True when the next read of `key` would go to the network.
  pub fn is_stale(&self, key: &QueryKey) -> bool {
    let inner = lock(&self.inner);
    inner
      .entries
      .get(key)
      .and_then(|entry| entry.fresh_data(inner.stale_time))
      .is_none()
  }

  /// True when `key` was invalidated (or removed) since its data was fetched.
  pub fn is_invalidated(&self, key: &QueryKey) -> bool {
    lock(&self.inner)
      .entries
      .get(key)
      .map_or(true, |entry| entry.invalidated)
  }

  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    lock(&self.inner)
      .entries
      .get(key)
      .is_some_and(|entry| entry.in_flight.is_some())
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    lock(&self.inner).entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    lock(&self.inner).entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Count an observer of `key`, creating the entry if needed.
  pub(crate) fn retain(&self, key: &QueryKey) {
    lock(&self.inner)
      .entries
      .entry(key.clone())
      .or_default()
      .observers += 1;
  }

  /// Drop an observer; the last one out evicts the entry unless a fetch is running.
  pub(crate) fn release(&self, key: &QueryKey) {
    let mut inner = lock(&self.inner);
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };
    entry.observers = entry.observers.saturating_sub(1);
    if entry.observers == 0 && entry.in_flight.is_none() {
      inner.entries.remove(key);
      debug!(%key, "evicted query with no observers");
    }
  }
}

/// Record the outcome of a fetch in its entry.
fn settle(
  cache: &Mutex<Inner>,
  key: &QueryKey,
  fetch_id: u64,
  result: &Result<CachedValue>,
) {
  let mut inner = lock(cache);
  let Some(entry) = inner.entries.get_mut(key) else {
    return;
  };
  // Entry was removed, recreated or invalidated while this fetch ran
  if !matches!(&entry.in_flight, Some((id, _)) if *id == fetch_id) {
    return;
  }

  entry.in_flight = None;
  match result {
    Ok(value) => {
      entry.data = Some(Arc::clone(value));
      entry.updated_at = Some(Utc::now());
      entry.error = None;
      entry.invalidated = false;
    }
    Err(e) => {
      debug!(%key, error = %e, "fetch failed");
      entry.error = Some(e.clone());
    }
  }
}
