//! Device-persisted session, independent of the network cache.

mod cache;
mod store;

pub use cache::{SessionCache, UserRecord, SESSION_KEY};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
