//! API client with every read keyed in the query cache and every write
//! declaring the keys it invalidates.

use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::query::{Mutation, Query, QueryClient};

use super::client::ApiClient;
use super::keys::{HandlerKey, MessageKey};
use super::transport::{ReqwestTransport, Transport};
use super::types::{Handler, HandlerInput, Message, MessageInput, RecordId};

/// Backend client with transparent caching.
///
/// This wraps the underlying [`ApiClient`] and provides the same operations:
/// - reads go through [`QueryClient::fetch_query`] under a [`HandlerKey`] or
///   [`MessageKey`], so repeated and concurrent reads share one request
/// - writes go through [`QueryClient::mutate`]; handler writes invalidate the
///   three handler lists (plus the record on update), message writes
///   invalidate the whole message namespace
///
/// The `*_query` and `*_mutation` methods build polled observers for views.
pub struct CachedApiClient<T = ReqwestTransport> {
  inner: ApiClient<T>,
  queries: QueryClient,
}

impl<T> Clone for CachedApiClient<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      queries: self.queries.clone(),
    }
  }
}

impl CachedApiClient<ReqwestTransport> {
  /// Create a cached client with a fresh cache.
  pub fn new(config: &Config) -> color_eyre::Result<Self> {
    let inner = ApiClient::new(config)?;
    let queries = match config.stale_time().and_then(|d| chrono::Duration::from_std(d).ok()) {
      Some(stale_time) => QueryClient::new().with_stale_time(stale_time),
      None => QueryClient::new(),
    };

    Ok(Self { inner, queries })
  }
}

impl<T: Transport> CachedApiClient<T> {
  pub fn from_parts(inner: ApiClient<T>, queries: QueryClient) -> Self {
    Self { inner, queries }
  }

  /// The uncached client.
  pub fn api(&self) -> &ApiClient<T> {
    &self.inner
  }

  pub fn queries(&self) -> &QueryClient {
    &self.queries
  }

  // ==========================================================================
  // Handler reads
  // ==========================================================================

  pub async fn handlers(&self) -> Result<Arc<Vec<Handler>>> {
    let inner = self.inner.clone();
    self
      .queries
      .fetch_query(HandlerKey::All, move || async move { inner.get_handlers().await })
      .await
  }

  pub async fn logistics_handlers(&self) -> Result<Arc<Vec<Handler>>> {
    let inner = self.inner.clone();
    self
      .queries
      .fetch_query(HandlerKey::Logistics, move || async move {
        inner.get_logistics_handlers().await
      })
      .await
  }

  pub async fn complaints_handlers(&self) -> Result<Arc<Vec<Handler>>> {
    let inner = self.inner.clone();
    self
      .queries
      .fetch_query(HandlerKey::Complaints, move || async move {
        inner.get_complaints_handlers().await
      })
      .await
  }

  // ==========================================================================
  // Handler writes
  // ==========================================================================

  pub async fn create_handler(&self, input: &HandlerInput) -> Result<Handler> {
    self
      .queries
      .mutate(&HandlerKey::lists(), self.inner.create_handler(input))
      .await
  }

  pub async fn update_handler(&self, id: &RecordId, input: &HandlerInput) -> Result<Handler> {
    self
      .queries
      .mutate(&HandlerKey::after_update(id), self.inner.update_handler(id, input))
      .await
  }

  pub async fn delete_handler(&self, id: &RecordId) -> Result<Value> {
    self
      .queries
      .mutate(&HandlerKey::lists(), self.inner.delete_handler(id))
      .await
  }

  // ==========================================================================
  // Message reads
  // ==========================================================================

  pub async fn messages(&self) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    self
      .queries
      .fetch_query(MessageKey::All, move || async move { inner.get_messages().await })
      .await
  }

  pub async fn message(&self, id: &RecordId) -> Result<Arc<Message>> {
    let inner = self.inner.clone();
    let id = id.clone();
    self
      .queries
      .fetch_query(MessageKey::Detail(id.clone()), move || async move {
        inner.get_message_by_id(&id).await
      })
      .await
  }

  pub async fn chat_messages(&self, chat_id: &RecordId) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    let chat_id = chat_id.clone();
    self
      .queries
      .fetch_query(MessageKey::Chat(chat_id.clone()), move || async move {
        inner.get_messages_by_chat_id(&chat_id).await
      })
      .await
  }

  pub async fn request_messages(&self, request_id: &RecordId) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    let request_id = request_id.clone();
    self
      .queries
      .fetch_query(MessageKey::Request(request_id.clone()), move || async move {
        inner.get_messages_by_request_id(&request_id).await
      })
      .await
  }

  pub async fn sender_messages(&self, sender_id: &RecordId) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    let sender_id = sender_id.clone();
    self
      .queries
      .fetch_query(MessageKey::Sender(sender_id.clone()), move || async move {
        inner.get_messages_by_sender_id(&sender_id).await
      })
      .await
  }

  pub async fn messages_by_read_status(&self, is_read: bool) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    self
      .queries
      .fetch_query(MessageKey::ReadStatus(is_read), move || async move {
        inner.get_messages_by_read_status(is_read).await
      })
      .await
  }

  pub async fn unread_chat_messages(&self, chat_id: &RecordId) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    let chat_id = chat_id.clone();
    self
      .queries
      .fetch_query(MessageKey::ChatUnread(chat_id.clone()), move || async move {
        inner.get_unread_messages_in_chat(&chat_id).await
      })
      .await
  }

  pub async fn unread_request_messages(&self, request_id: &RecordId) -> Result<Arc<Vec<Message>>> {
    let inner = self.inner.clone();
    let request_id = request_id.clone();
    self
      .queries
      .fetch_query(
        MessageKey::RequestUnread(request_id.clone()),
        move || async move { inner.get_unread_messages_in_request(&request_id).await },
      )
      .await
  }

  /// One page of a chat; each (limit, cursor) pair is its own cache slot.
  pub async fn paginated_messages(
    &self,
    chat_id: &RecordId,
    limit: Option<u32>,
    last_date: Option<&str>,
  ) -> Result<Arc<Vec<Message>>> {
    let key = MessageKey::ChatPage {
      chat_id: chat_id.clone(),
      limit: limit.unwrap_or(super::messages::DEFAULT_PAGE_LIMIT),
      last_date: last_date.map(String::from),
    };
    let inner = self.inner.clone();
    let chat_id = chat_id.clone();
    let last_date = last_date.map(String::from);
    self
      .queries
      .fetch_query(key, move || async move {
        inner
          .get_paginated_messages(&chat_id, limit, last_date.as_deref())
          .await
      })
      .await
  }

  // ==========================================================================
  // Message writes
  // ==========================================================================

  pub async fn create_message(&self, input: &MessageInput) -> Result<Message> {
    self
      .queries
      .mutate(&[MessageKey::namespace()], self.inner.create_message(input))
      .await
  }

  pub async fn update_message(&self, id: &RecordId, input: &MessageInput) -> Result<Message> {
    self
      .queries
      .mutate(&[MessageKey::namespace()], self.inner.update_message(id, input))
      .await
  }

  pub async fn patch_message(&self, id: &RecordId, patch: &MessageInput) -> Result<Message> {
    self
      .queries
      .mutate(&[MessageKey::namespace()], self.inner.patch_message(id, patch))
      .await
  }

  pub async fn delete_message(&self, id: &RecordId) -> Result<Value> {
    self
      .queries
      .mutate(&[MessageKey::namespace()], self.inner.delete_message(id))
      .await
  }

  pub async fn mark_message_as_read(&self, id: &RecordId) -> Result<Value> {
    self
      .queries
      .mutate(&[MessageKey::namespace()], self.inner.mark_message_as_read(id))
      .await
  }

  pub async fn mark_all_messages_as_read_in_chat(&self, chat_id: &RecordId) -> Result<Value> {
    self
      .queries
      .mutate(
        &[MessageKey::namespace()],
        self.inner.mark_all_messages_as_read_in_chat(chat_id),
      )
      .await
  }

  pub async fn mark_all_messages_as_read_in_request(&self, request_id: &RecordId) -> Result<Value> {
    self
      .queries
      .mutate(
        &[MessageKey::namespace()],
        self.inner.mark_all_messages_as_read_in_request(request_id),
      )
      .await
  }

  // ==========================================================================
  // Observers for views
  // ==========================================================================

  pub fn handlers_query(&self) -> Query<Vec<Handler>> {
    let inner = self.inner.clone();
    Query::new(&self.queries, HandlerKey::All, move || {
      let inner = inner.clone();
      async move { inner.get_handlers().await }
    })
  }

  pub fn logistics_handlers_query(&self) -> Query<Vec<Handler>> {
    let inner = self.inner.clone();
    Query::new(&self.queries, HandlerKey::Logistics, move || {
      let inner = inner.clone();
      async move { inner.get_logistics_handlers().await }
    })
  }

  pub fn complaints_handlers_query(&self) -> Query<Vec<Handler>> {
    let inner = self.inner.clone();
    Query::new(&self.queries, HandlerKey::Complaints, move || {
      let inner = inner.clone();
      async move { inner.get_complaints_handlers().await }
    })
  }

  pub fn chat_messages_query(&self, chat_id: &RecordId) -> Query<Vec<Message>> {
    let inner = self.inner.clone();
    let key = MessageKey::Chat(chat_id.clone());
    let chat_id = chat_id.clone();
    Query::new(&self.queries, key, move || {
      let inner = inner.clone();
      let chat_id = chat_id.clone();
      async move { inner.get_messages_by_chat_id(&chat_id).await }
    })
  }

  pub fn request_messages_query(&self, request_id: &RecordId) -> Query<Vec<Message>> {
    let inner = self.inner.clone();
    let key = MessageKey::Request(request_id.clone());
    let request_id = request_id.clone();
    Query::new(&self.queries, key, move || {
      let inner = inner.clone();
      let request_id = request_id.clone();
      async move { inner.get_messages_by_request_id(&request_id).await }
    })
  }

  pub fn create_handler_mutation(&self) -> Mutation<HandlerInput, Handler> {
    let inner = self.inner.clone();
    Mutation::new(&self.queries, move |input: HandlerInput| {
      let inner = inner.clone();
      async move { inner.create_handler(&input).await }
    })
    .invalidates(HandlerKey::lists())
  }

  pub fn update_handler_mutation(&self) -> Mutation<(RecordId, HandlerInput), Handler> {
    let inner = self.inner.clone();
    Mutation::new(&self.queries, move |(id, input): (RecordId, HandlerInput)| {
      let inner = inner.clone();
      async move { inner.update_handler(&id, &input).await }
    })
    .invalidates_with(|(id, _)| HandlerKey::after_update(id))
  }

  pub fn delete_handler_mutation(&self) -> Mutation<RecordId, Value> {
    let inner = self.inner.clone();
    Mutation::new(&self.queries, move |id: RecordId| {
      let inner = inner.clone();
      async move { inner.delete_handler(&id).await }
    })
    .invalidates(HandlerKey::lists())
  }

  pub fn send_message_mutation(&self) -> Mutation<MessageInput, Message> {
    let inner = self.inner.clone();
    Mutation::new(&self.queries, move |input: MessageInput| {
      let inner = inner.clone();
      async move { inner.create_message(&input).await }
    })
    .invalidates(vec![MessageKey::namespace()])
  }

  pub fn mark_chat_read_mutation(&self) -> Mutation<RecordId, Value> {
    let inner = self.inner.clone();
    Mutation::new(&self.queries, move |chat_id: RecordId| {
      let inner = inner.clone();
      async move { inner.mark_all_messages_as_read_in_chat(&chat_id).await }
    })
    .invalidates(vec![MessageKey::namespace()])
  }
}
