//! Result wrapper that says where dispatcher data came from.

use serde::Serialize;

/// Where an operation's result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
  /// Served from the read cache, no backend contacted
  Cache,
  /// Fresh data from the remote backend
  Remote,
  /// Local storage, either by configuration or as a fallback
  Local,
  /// Input failed validation, no backend contacted
  Rejected,
}

/// Result of a dispatcher operation.
///
/// Operations never fail outright. `data` carries the documented sentinel
/// (`None`, `false`, empty list) when nothing was found or written, and
/// `degraded` is set when the remote backend was tried and failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
  pub data: T,
  pub source: DataSource,
  pub degraded: bool,
}

impl<T> Outcome<T> {
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: DataSource::Cache,
      degraded: false,
    }
  }

  pub fn from_remote(data: T) -> Self {
    Self {
      data,
      source: DataSource::Remote,
      degraded: false,
    }
  }

  pub fn from_local(data: T, degraded: bool) -> Self {
    Self {
      data,
      source: DataSource::Local,
      degraded,
    }
  }

  pub fn rejected(data: T) -> Self {
    Self {
      data,
      source: DataSource::Rejected,
      degraded: false,
    }
  }

  pub fn into_data(self) -> T {
    self.data
  }
}
