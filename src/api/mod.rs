//! Backend data access: REST transport functions plus the cached layer views use.

mod cached_client;
mod client;
mod handlers;
mod keys;
mod messages;
#[cfg(test)]
mod testing;
mod transport;
mod types;

pub use cached_client::CachedApiClient;
pub use client::ApiClient;
pub use keys::{HandlerKey, MessageKey};
pub use messages::DEFAULT_PAGE_LIMIT;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
pub use types::{Handler, HandlerInput, Message, MessageInput, RecordId};
