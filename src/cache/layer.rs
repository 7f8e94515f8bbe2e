//! Key/value cache with a fixed time-to-live.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Five minutes.
pub const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct CacheEntry {
  value: Value,
  stored_at: DateTime<Utc>,
}

/// Read cache shared by every dispatcher operation of one store.
///
/// Values are kept as JSON so one map can hold product lists, single orders
/// and anything else the dispatcher reads.
#[derive(Debug)]
pub struct TtlCache {
  entries: Mutex<HashMap<String, CacheEntry>>,
  /// How long before an entry is considered stale
  ttl: Duration,
}

impl Default for TtlCache {
  fn default() -> Self {
    Self::new()
  }
}

impl TtlCache {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl: Duration::seconds(DEFAULT_TTL_SECS),
    }
  }

  /// Set the time-to-live for entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  // The map holds plain data, so a panic mid-update cannot leave it in a
  // state worth refusing to read.
  fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn is_fresh(&self, entry: &CacheEntry) -> bool {
    self.is_fresh_at(entry, Utc::now())
  }

  /// An entry exactly `ttl` old still counts as fresh.
  fn is_fresh_at(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    now - entry.stored_at <= self.ttl
  }

  /// Cached value for `key` if it is younger than the TTL.
  ///
  /// Stale entries are evicted on the way out. An entry that no longer
  /// decodes as `T` is also evicted and reported as a miss.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let mut entries = self.lock();
    let entry = entries.get(key)?;

    if !self.is_fresh(entry) {
      debug!(key, "cache entry expired");
      entries.remove(key);
      return None;
    }

    match serde_json::from_value(entry.value.clone()) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key, error = %e, "dropping undecodable cache entry");
        entries.remove(key);
        None
      }
    }
  }

  /// Store `value` under `key`, replacing any previous entry.
  pub fn set<T: Serialize>(&self, key: &str, value: &T) {
    match serde_json::to_value(value) {
      Ok(value) => {
        self.lock().insert(
          key.to_string(),
          CacheEntry {
            value,
            stored_at: Utc::now(),
          },
        );
      }
      Err(e) => warn!(key, error = %e, "value not cacheable"),
    }
  }

  /// Evict every entry whose key starts with `prefix`. Returns how many went.
  pub fn invalidate_prefix(&self, prefix: &str) -> usize {
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|key, _| !key.starts_with(prefix));
    let removed = before - entries.len();
    if removed > 0 {
      debug!(prefix, removed, "cache invalidated");
    }
    removed
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  pub fn clear(&self) {
    self.lock().clear();
  }

  /// Pretend the entry was stored `by` earlier than it was.
  #[cfg(test)]
  pub(crate) fn backdate(&self, key: &str, by: Duration) {
    if let Some(entry) = self.lock().get_mut(key) {
      entry.stored_at = entry.stored_at - by;
    }
  }
}
