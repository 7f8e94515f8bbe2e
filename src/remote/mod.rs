//! Remote relational backend.
//!
//! The dispatcher only sees [`RemoteBackend`]: a row-oriented API over the
//! `products` and `orders` tables that hands back raw snake_case rows for the
//! normalization layer to interpret.

mod client;
pub mod images;
mod retry;

use async_trait::async_trait;
use color_eyre::Result;
use serde_json::Value;

pub use client::RestClient;
pub use images::{HttpImageRemover, ImageRemover};
pub use retry::{with_retry, RetryPolicy};

/// Tables the storefront reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Products,
  Orders,
}

impl Table {
  pub fn name(&self) -> &'static str {
    match self {
      Table::Products => "products",
      Table::Orders => "orders",
    }
  }

  /// Column selection for listings. Orders embed the product they reference.
  pub fn select_clause(&self) -> &'static str {
    match self {
      Table::Products => "*",
      Table::Orders => "*,products(name,price)",
    }
  }
}

/// Listing parameters: equality filters plus an optional offset/limit window.
///
/// Listings are always ordered by creation time, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
  pub filters: Vec<(String, String)>,
  pub offset: Option<u32>,
  pub limit: Option<u32>,
}

impl RowQuery {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an equality filter on `column`.
  pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
    self.filters.push((column.to_string(), value.into()));
    self
  }

  pub fn range(mut self, offset: u32, limit: u32) -> Self {
    self.offset = Some(offset);
    self.limit = Some(limit);
    self
  }
}

/// Query/mutation surface of the remote data service.
///
/// Single-row reads and updates report a missing row as `Ok(None)`, distinct
/// from an error.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
  async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Value>>;

  async fn select_one(&self, table: Table, id: &str) -> Result<Option<Value>>;

  /// Insert a row and return it as stored, with backend-assigned fields.
  async fn insert(&self, table: Table, row: &Value) -> Result<Value>;

  async fn update(&self, table: Table, id: &str, patch: &Value) -> Result<Option<Value>>;

  /// Delete by id. Deleting a missing row succeeds.
  async fn delete(&self, table: Table, id: &str) -> Result<()>;
}
