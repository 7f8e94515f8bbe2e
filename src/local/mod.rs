//! Local durable storage, the fallback source of truth.
//!
//! A string key/value surface. The store keeps two keys, `"products"` and
//! `"orders"`, each holding a JSON array of camelCase records.

mod collections;
mod sqlite;

use color_eyre::Result;

pub use collections::{load_orders, load_products, save_orders, save_products};
pub use sqlite::SqliteStore;

pub const PRODUCTS_KEY: &str = "products";
pub const ORDERS_KEY: &str = "orders";

/// Trait for local storage backends.
///
/// No transactions: read-modify-write sequencing is the caller's job.
pub trait LocalStore: Send + Sync {
  /// Raw value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove `key`. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<()>;
}
