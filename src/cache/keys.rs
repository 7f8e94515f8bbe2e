//! Cache keys for storefront reads.

use sha2::{Digest, Sha256};

use crate::store::{OrderQuery, ProductQuery};

pub const PRODUCTS_PREFIX: &str = "products:";
pub const ORDERS_PREFIX: &str = "orders:";

/// Every cached read, keyed by operation and parameters.
#[derive(Clone, Debug)]
pub enum QueryKey<'a> {
  /// Product listing
  Products(&'a ProductQuery),
  /// Single product by id
  Product(&'a str),
  /// Order listing
  Orders(&'a OrderQuery),
  /// Single order by id
  Order(&'a str),
}

impl QueryKey<'_> {
  /// Key into the cache.
  ///
  /// The namespace stays readable so writes can invalidate by prefix; list
  /// parameters are hashed into a fixed-length suffix.
  pub fn cache_key(&self) -> String {
    match self {
      Self::Products(query) => {
        let shape = format!(
          "category={}:{}",
          query.category.map(|c| c.as_str()).unwrap_or(""),
          page_shape(query.page.map(|p| (p.page, p.limit)))
        );
        format!("{}list:{}", PRODUCTS_PREFIX, digest(&shape))
      }
      Self::Product(id) => format!("{}item:{}", PRODUCTS_PREFIX, id),
      Self::Orders(query) => {
        let shape = format!(
          "status={}:{}",
          query.status.map(|s| s.as_str()).unwrap_or(""),
          page_shape(query.page.map(|p| (p.page, p.limit)))
        );
        format!("{}list:{}", ORDERS_PREFIX, digest(&shape))
      }
      Self::Order(id) => format!("{}item:{}", ORDERS_PREFIX, id),
    }
  }

  /// Human-readable description for logs.
  pub fn description(&self) -> String {
    match self {
      Self::Products(query) => match query.category {
        Some(c) => format!("{} products", c),
        None => "all products".to_string(),
      },
      Self::Product(id) => format!("product {}", id),
      Self::Orders(query) => match query.status {
        Some(s) => format!("{} orders", s),
        None => "all orders".to_string(),
      },
      Self::Order(id) => format!("order {}", id),
    }
  }
}

fn page_shape(page: Option<(u32, u32)>) -> String {
  match page {
    Some((page, limit)) => format!("page={}:limit={}", page, limit),
    None => "page=all".to_string(),
  }
}

/// SHA256 hash for stable, fixed-length keys
fn digest(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}
