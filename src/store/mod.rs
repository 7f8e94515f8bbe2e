//! The storefront data-access facade.
//!
//! Every operation follows one template:
//!
//! 1. Reads check the cache first and return on a hit.
//! 2. With a remote backend configured, try it. On success normalize, cache
//!    (reads) or invalidate (writes), mirror into local storage and return.
//!    On failure log and fall through.
//! 3. Otherwise use local storage.
//!
//! Backend errors never reach the caller; see [`Outcome`].

mod orders;
mod outcome;
mod products;
mod query;

#[cfg(test)]
mod fake;

use color_eyre::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::local::{self, LocalStore, SqliteStore};
use crate::model::{Order, Product};
use crate::remote::{HttpImageRemover, ImageRemover, RemoteBackend, RestClient, RetryPolicy};

pub use outcome::{DataSource, Outcome};
pub use query::{OrderQuery, Page, ProductQuery};

/// Backend health and record counts, as reported by `storefront status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub remote_configured: bool,
  pub degraded: bool,
  pub products: usize,
  pub orders: usize,
}

/// Data-access facade over the remote backend, local storage and the cache.
///
/// Whether a remote backend is used is fixed when the store is built.
pub struct Storefront {
  remote: Option<Arc<dyn RemoteBackend>>,
  local: Arc<dyn LocalStore>,
  cache: TtlCache,
  retry: RetryPolicy,
  images: Option<Arc<dyn ImageRemover>>,
  /// Serializes local read-modify-write sequences
  write_lock: tokio::sync::Mutex<()>,
}

impl Storefront {
  /// Local-only store.
  pub fn new(local: Arc<dyn LocalStore>) -> Self {
    Self {
      remote: None,
      local,
      cache: TtlCache::new(),
      retry: RetryPolicy::default(),
      images: None,
      write_lock: tokio::sync::Mutex::new(()),
    }
  }

  pub fn with_remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
    self.remote = Some(remote);
    self
  }

  pub fn with_cache(mut self, cache: TtlCache) -> Self {
    self.cache = cache;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_image_remover(mut self, images: Arc<dyn ImageRemover>) -> Self {
    self.images = Some(images);
    self
  }

  /// Build from configuration: SQLite local store, REST backend when both
  /// URL and key are set, image cleanup when an endpoint is configured.
  pub fn from_config(config: &Config) -> Result<Self> {
    let local = SqliteStore::open(&config.local_path()?)?;
    let mut store = Self::new(Arc::new(local))
      .with_cache(TtlCache::new().with_ttl(config.cache_ttl()))
      .with_retry(config.retry.policy());

    match config.remote_settings() {
      Some(settings) => {
        info!(url = %settings.url, "remote backend configured");
        store = store.with_remote(Arc::new(RestClient::new(&settings)?));
      }
      None => info!("remote backend not configured, using local storage only"),
    }

    if let Some(endpoint) = &config.images.delete_endpoint {
      match url::Url::parse(endpoint) {
        Ok(url) => store = store.with_image_remover(Arc::new(HttpImageRemover::new(url))),
        Err(e) => warn!(endpoint, error = %e, "ignoring invalid image delete endpoint"),
      }
    }

    Ok(store)
  }

  pub fn is_remote_configured(&self) -> bool {
    self.remote.is_some()
  }

  /// Count products and orders, reading both listings concurrently.
  pub async fn summary(&self) -> Summary {
    let (all_products, all_orders) = (ProductQuery::all(), OrderQuery::all());
    let (products, orders) = futures::join!(
      self.get_products(&all_products),
      self.get_orders(&all_orders)
    );

    Summary {
      remote_configured: self.is_remote_configured(),
      degraded: products.degraded || orders.degraded,
      products: products.data.len(),
      orders: orders.data.len(),
    }
  }

  pub fn cache(&self) -> &TtlCache {
    &self.cache
  }

  pub fn local(&self) -> &dyn LocalStore {
    self.local.as_ref()
  }

  /// Upsert records into their local collection as a backup copy.
  ///
  /// Mirroring is best effort; a failure is logged and otherwise ignored.
  async fn mirror<T: Record>(&self, records: &[T]) {
    if records.is_empty() {
      return;
    }

    let _guard = self.write_lock.lock().await;
    let mut existing = T::load(self.local());
    for record in records {
      match existing.iter_mut().find(|e| e.id() == record.id()) {
        Some(slot) => *slot = record.clone(),
        None => existing.insert(0, record.clone()),
      }
    }

    match T::save(self.local(), &existing) {
      Ok(()) => debug!(kind = T::KIND, count = records.len(), "mirrored to local storage"),
      Err(e) => warn!(kind = T::KIND, error = %e, "failed to mirror to local storage"),
    }
  }

  /// Drop a record from its local collection. Missing ids are fine.
  async fn mirror_remove<T: Record>(&self, id: &str) {
    let _guard = self.write_lock.lock().await;
    let mut existing = T::load(self.local());
    let before = existing.len();
    existing.retain(|e| e.id() != id);
    if existing.len() == before {
      return;
    }
    if let Err(e) = T::save(self.local(), &existing) {
      warn!(kind = T::KIND, id, error = %e, "failed to remove from local storage");
    }
  }
}

/// Canonical records the store keeps local collections of.
trait Record: Clone + Send + Sync {
  const KIND: &'static str;

  fn id(&self) -> &str;

  fn load(store: &dyn LocalStore) -> Vec<Self>;

  fn save(store: &dyn LocalStore, records: &[Self]) -> Result<()>;
}

impl Record for Product {
  const KIND: &'static str = "product";

  fn id(&self) -> &str {
    &self.id
  }

  fn load(store: &dyn LocalStore) -> Vec<Self> {
    local::load_products(store)
  }

  fn save(store: &dyn LocalStore, records: &[Self]) -> Result<()> {
    local::save_products(store, records)
  }
}

impl Record for Order {
  const KIND: &'static str = "order";

  fn id(&self) -> &str {
    &self.id
  }

  fn load(store: &dyn LocalStore) -> Vec<Self> {
    local::load_orders(store)
  }

  fn save(store: &dyn LocalStore, records: &[Self]) -> Result<()> {
    local::save_orders(store, records)
  }
}
