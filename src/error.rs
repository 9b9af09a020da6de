//! Error taxonomy shared by the transport, query and session layers.

/// Errors raised by the data-access layer.
///
/// The type is `Clone` so one in-flight fetch can hand the same outcome to
/// every subscriber waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  /// Non-success HTTP status, or no response at all (`status == None`).
  #[error("{operation}")]
  RequestFailed {
    operation: &'static str,
    status: Option<u16>,
  },

  /// Success status, but the body did not decode into the expected record.
  #[error("{operation}: unexpected response body")]
  MalformedResponse { operation: &'static str },

  /// A caller-side precondition failed before any request was attempted.
  #[error("Invalid {field}: {reason}")]
  ValidationFailed { field: &'static str, reason: String },

  /// The device key-value store threw while reading, writing or removing.
  #[error("Storage {action} failed: {reason}")]
  StorageFailed { action: &'static str, reason: String },

  /// A cached value was requested as a different type than it was stored as.
  #[error("Cached value for {key} has a different type")]
  TypeMismatch { key: String },

  /// The task driving a shared fetch or mutation went away before finishing.
  #[error("{0} was cancelled")]
  Cancelled(&'static str),
}

impl Error {
  pub(crate) fn request_failed(operation: &'static str, status: Option<u16>) -> Self {
    Error::RequestFailed { operation, status }
  }

  pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Error::ValidationFailed {
      field,
      reason: reason.into(),
    }
  }

  pub(crate) fn storage(action: &'static str, reason: impl std::fmt::Display) -> Self {
    Error::StorageFailed {
      action,
      reason: reason.to_string(),
    }
  }

  /// True when a request never got a response (connection refused, DNS, reset).
  pub fn is_network_failure(&self) -> bool {
    matches!(self, Error::RequestFailed { status: None, .. })
  }

  /// HTTP status carried by a rejected request, if one was received.
  pub fn status(&self) -> Option<u16> {
    match self {
      Error::RequestFailed { status, .. } => *status,
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
