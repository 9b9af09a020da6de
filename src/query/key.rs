//! Segmented cache keys.

use std::fmt;

/// Identifies one cache slot: a resource name followed by scoping segments,
/// e.g. `["messages", "chat", "42"]`.
///
/// Keys compare segment by segment, so `["messages", "chat"]` is a prefix of
/// `["messages", "chat", "42"]` but `["messages", "ch"]` is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  /// Key for a whole resource namespace.
  pub fn new(resource: impl Into<String>) -> Self {
    Self(vec![resource.into()])
  }

  /// Append a scoping segment.
  pub fn with(mut self, segment: impl ToString) -> Self {
    self.0.push(segment.to_string());
    self
  }

  pub fn segments(&self) -> &[String] {
    &self.0
  }

  /// The resource namespace (first segment).
  pub fn resource(&self) -> &str {
    self.0.first().map(String::as_str).unwrap_or_default()
  }

  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.join(":"))
  }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
  fn from(segments: [&str; N]) -> Self {
    Self(segments.iter().map(|s| s.to_string()).collect())
  }
}

impl From<&QueryKey> for QueryKey {
  fn from(key: &QueryKey) -> Self {
    key.clone()
  }
}
