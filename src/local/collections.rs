//! Typed access to the product and order arrays in local storage.
//!
//! Reads never fail: a missing key, an unreadable store or corrupt JSON all
//! read as an empty collection. Records go through normalization so arrays
//! written in the remote naming are still understood.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{LocalStore, ORDERS_KEY, PRODUCTS_KEY};
use crate::model::{normalize_order, normalize_product, Order, Product};

fn load_rows(store: &dyn LocalStore, key: &str) -> Vec<Value> {
  let raw = match store.get(key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return Vec::new(),
    Err(e) => {
      warn!(key, error = %e, "local store unreadable, treating as empty");
      return Vec::new();
    }
  };

  match serde_json::from_str::<Value>(&raw) {
    Ok(Value::Array(rows)) => rows,
    Ok(_) => {
      warn!(key, "local collection is not an array, treating as empty");
      Vec::new()
    }
    Err(e) => {
      warn!(key, error = %e, "local collection is corrupt, treating as empty");
      Vec::new()
    }
  }
}

fn save_rows<T: Serialize>(store: &dyn LocalStore, key: &str, records: &[T]) -> Result<()> {
  let json = serde_json::to_string(records)
    .map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
  store.set(key, &json)
}

pub fn load_products(store: &dyn LocalStore) -> Vec<Product> {
  load_rows(store, PRODUCTS_KEY)
    .iter()
    .map(normalize_product)
    .collect()
}

pub fn save_products(store: &dyn LocalStore, products: &[Product]) -> Result<()> {
  save_rows(store, PRODUCTS_KEY, products)
}

pub fn load_orders(store: &dyn LocalStore) -> Vec<Order> {
  load_rows(store, ORDERS_KEY)
    .iter()
    .map(normalize_order)
    .collect()
}

pub fn save_orders(store: &dyn LocalStore, orders: &[Order]) -> Result<()> {
  save_rows(store, ORDERS_KEY, orders)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::local::SqliteStore;
  use crate::model::Category;

  #[test]
  fn test_missing_key_is_empty() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert!(load_products(&store).is_empty());
    assert!(load_orders(&store).is_empty());
  }

  #[test]
  fn test_corrupt_json_is_empty() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.set(PRODUCTS_KEY, "{not json").unwrap();
    store.set(ORDERS_KEY, r#"{"id":"o1"}"#).unwrap();
    assert!(load_products(&store).is_empty());
    assert!(load_orders(&store).is_empty());
  }

  #[test]
  fn test_reads_either_naming() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .set(
        PRODUCTS_KEY,
        r#"[
          {"id":"a","name":"Mint","price":"150","imageUrl":"/img/mint.png","category":"tea"},
          {"id":"b","name":"Ginseng","price":900,"image_url":"/img/ginseng.png","category":"herbal"}
        ]"#,
      )
      .unwrap();

    let products = load_products(&store);
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].price, 150.0);
    assert_eq!(products[0].category, Category::Tea);
    assert_eq!(products[1].image_url.as_deref(), Some("/img/ginseng.png"));
  }

  #[test]
  fn test_save_then_load() {
    let store = SqliteStore::open_in_memory().unwrap();
    let products = vec![crate::model::normalize_product(&serde_json::json!({
      "id": "p1",
      "name": "Sage",
      "description": "Leaves",
      "price": 250,
      "category": "herbal"
    }))];

    save_products(&store, &products).unwrap();
    assert_eq!(load_products(&store), products);

    let raw = store.get(PRODUCTS_KEY).unwrap().unwrap();
    assert!(raw.contains("\"createdAt\""));
    assert!(!raw.contains("\"created_at\""));
  }
}
