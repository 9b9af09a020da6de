//! Client-side data access for the field operations backend.
//!
//! - [`api`]: REST transport functions and the cached client views use
//! - [`query`]: shared query cache, observers and mutations
//! - [`session`]: the signed-in user, persisted in a key-value store

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod session;
pub mod validate;

pub use error::{Error, Result};
