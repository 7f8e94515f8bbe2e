//! Boundary mapping between backend rows and canonical records.
//!
//! The remote backend speaks snake_case (`image_url`, `created_at`), local
//! storage keeps camelCase (`imageUrl`, `createdAt`). Inbound functions accept
//! either and never fail; outbound functions produce remote rows.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};

use super::{NewOrder, NewProduct, Order, OrderStatus, Product, ProductPatch};

// ============================================================================
// Inbound: raw row -> canonical
// ============================================================================

/// First non-null value among the candidate field names.
fn field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a Value> {
  names
    .iter()
    .filter_map(|name| raw.get(*name))
    .find(|v| !v.is_null())
}

fn text(raw: &Value, names: &[&str]) -> String {
  match field(raw, names) {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    _ => String::new(),
  }
}

fn optional_text(raw: &Value, names: &[&str]) -> Option<String> {
  Some(text(raw, names)).filter(|s| !s.is_empty())
}

/// Prices may arrive as numbers or numeric strings. Anything unusable is 0.
fn price(value: Option<&Value>) -> f64 {
  let parsed = match value {
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  parsed.filter(|p| p.is_finite() && *p >= 0.0).unwrap_or(0.0)
}

fn stock(value: Option<&Value>) -> Option<u32> {
  let parsed = match value {
    Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
    Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
    _ => None,
  }?;
  Some(parsed.clamp(0, u32::MAX as i64) as u32)
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
  match value? {
    Value::String(s) => parse_timestamp(s),
    // Epoch milliseconds
    Value::Number(n) => n
      .as_i64()
      .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    _ => None,
  }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  // Postgres `timestamp` columns come back without an offset
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
}

fn timestamps(raw: &Value) -> (DateTime<Utc>, DateTime<Utc>) {
  let created_at =
    timestamp(field(raw, &["createdAt", "created_at"])).unwrap_or_else(Utc::now);
  let updated_at = timestamp(field(raw, &["updatedAt", "updated_at"])).unwrap_or(created_at);
  (created_at, updated_at)
}

/// Canonical product from a row in either naming.
pub fn normalize_product(raw: &Value) -> Product {
  let (created_at, updated_at) = timestamps(raw);

  Product {
    id: text(raw, &["id"]),
    name: text(raw, &["name"]),
    description: text(raw, &["description"]),
    price: price(field(raw, &["price"])),
    image_url: optional_text(raw, &["imageUrl", "image_url"]),
    category: text(raw, &["category"]).parse().unwrap_or_default(),
    stock_quantity: stock(field(raw, &["stockQuantity", "stock_quantity"])),
    created_at,
    updated_at,
  }
}

/// Canonical order from a row in either naming.
///
/// Snapshot fields fall back to the joined `products` object that remote
/// listings embed.
pub fn normalize_order(raw: &Value) -> Order {
  let (created_at, updated_at) = timestamps(raw);
  let joined = raw.get("products").filter(|p| p.is_object());

  let product_name = optional_text(raw, &["productName", "product_name"])
    .or_else(|| joined.and_then(|p| optional_text(p, &["name"])))
    .unwrap_or_default();
  let product_price = field(raw, &["productPrice", "product_price"])
    .or_else(|| joined.and_then(|p| field(p, &["price"])));

  Order {
    id: text(raw, &["id"]),
    product_id: text(raw, &["productId", "product_id"]),
    product_name,
    product_price: price(product_price),
    customer_name: text(raw, &["customerName", "customer_name"]),
    customer_phone: text(raw, &["customerPhone", "customer_phone"]),
    customer_address: text(raw, &["customerAddress", "customer_address"]),
    customer_region: text(raw, &["customerRegion", "customer_region"]),
    status: text(raw, &["status"]).parse().unwrap_or_default(),
    created_at,
    updated_at,
  }
}

// ============================================================================
// Outbound: canonical -> remote row
// ============================================================================

/// Insert row for a new product. Ids and timestamps are left to the backend.
pub fn product_row(product: &NewProduct) -> Value {
  let mut row = Map::new();
  row.insert("name".into(), json!(product.name));
  row.insert("description".into(), json!(product.description));
  row.insert("price".into(), json!(product.price));
  row.insert(
    "image_url".into(),
    json!(product.image_url.as_deref().filter(|u| !u.is_empty())),
  );
  row.insert("category".into(), json!(product.category.as_str()));
  if let Some(stock) = product.stock_quantity {
    row.insert("stock_quantity".into(), json!(stock));
  }
  Value::Object(row)
}

/// Update row carrying only the fields the patch sets.
pub fn product_patch_row(patch: &ProductPatch, now: DateTime<Utc>) -> Value {
  let mut row = Map::new();
  if let Some(name) = &patch.name {
    row.insert("name".into(), json!(name));
  }
  if let Some(description) = &patch.description {
    row.insert("description".into(), json!(description));
  }
  if let Some(price) = patch.price {
    row.insert("price".into(), json!(price));
  }
  if let Some(image_url) = &patch.image_url {
    let image_url = Some(image_url.as_str()).filter(|u| !u.is_empty());
    row.insert("image_url".into(), json!(image_url));
  }
  if let Some(category) = patch.category {
    row.insert("category".into(), json!(category.as_str()));
  }
  if let Some(stock) = patch.stock_quantity {
    row.insert("stock_quantity".into(), json!(stock));
  }
  row.insert("updated_at".into(), json!(now));
  Value::Object(row)
}

/// Insert row for a new order, snapshotting the referenced product.
pub fn order_row(order: &NewOrder, product: &Product) -> Value {
  json!({
    "product_id": order.product_id,
    "product_name": product.name,
    "product_price": product.price,
    "customer_name": order.customer_name,
    "customer_phone": order.customer_phone,
    "customer_address": order.customer_address,
    "customer_region": order.customer_region,
    "status": OrderStatus::Pending.as_str(),
  })
}

pub fn status_row(status: OrderStatus, now: DateTime<Utc>) -> Value {
  json!({ "status": status.as_str(), "updated_at": now })
}

pub fn stock_row(stock: u32, now: DateTime<Utc>) -> Value {
  json!({ "stock_quantity": stock, "updated_at": now })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Category;

  fn remote_product() -> Value {
    json!({
      "id": "7f1c",
      "name": "Moringa",
      "description": "Capsules",
      "price": "1200.50",
      "image_url": "https://cdn.example.com/moringa.png",
      "category": "supplement",
      "stock_quantity": 3,
      "created_at": "2024-03-01T10:00:00.123456+00:00",
      "updated_at": "2024-03-02T10:00:00+00:00"
    })
  }

  #[test]
  fn test_snake_case_row() {
    let product = normalize_product(&remote_product());
    assert_eq!(product.id, "7f1c");
    assert_eq!(product.price, 1200.5);
    assert_eq!(
      product.image_url.as_deref(),
      Some("https://cdn.example.com/moringa.png")
    );
    assert_eq!(product.stock_quantity, Some(3));
    assert_eq!(product.created_at.to_rfc3339(), "2024-03-01T10:00:00.123456+00:00");
  }

  #[test]
  fn test_camel_case_row() {
    let raw = json!({
      "id": "a1",
      "name": "Chamomile",
      "description": "Dried flowers",
      "price": 300,
      "imageUrl": "/uploads/chamomile.jpg",
      "category": "herbal",
      "createdAt": "2024-01-01T00:00:00Z",
    });
    let product = normalize_product(&raw);
    assert_eq!(product.category, Category::Herbal);
    assert_eq!(product.image_url.as_deref(), Some("/uploads/chamomile.jpg"));
    assert_eq!(product.stock_quantity, None);
    assert_eq!(product.updated_at, product.created_at);
  }

  #[test]
  fn test_missing_fields_get_defaults() {
    let before = Utc::now();
    let product = normalize_product(&json!({ "price": "abc", "category": "coffee" }));
    assert_eq!(product.id, "");
    assert_eq!(product.name, "");
    assert_eq!(product.price, 0.0);
    assert_eq!(product.category, Category::Supplement);
    assert!(product.created_at >= before);

    let product = normalize_product(&Value::Null);
    assert_eq!(product.price, 0.0);
  }

  #[test]
  fn test_negative_price_is_clamped() {
    let product = normalize_product(&json!({ "price": -4 }));
    assert_eq!(product.price, 0.0);
  }

  #[test]
  fn test_naive_postgres_timestamp() {
    let product = normalize_product(&json!({ "created_at": "2024-05-06 07:08:09.5" }));
    assert_eq!(product.created_at.to_rfc3339(), "2024-05-06T07:08:09.500+00:00");
  }

  #[test]
  fn test_normalize_product_is_idempotent() {
    for raw in [remote_product(), json!({ "name": "x" }), json!({})] {
      let once = normalize_product(&raw);
      let reencoded = serde_json::to_value(&once).unwrap();
      assert_eq!(normalize_product(&reencoded), once);
    }
  }

  #[test]
  fn test_order_snapshot_from_join() {
    let raw = json!({
      "id": 12,
      "product_id": "7f1c",
      "customer_name": "Ali",
      "customer_phone": "0555123456",
      "customer_address": "Bab Ezzouar",
      "customer_region": "Alger",
      "status": "shipped",
      "products": { "name": "Moringa", "price": 1200 }
    });
    let order = normalize_order(&raw);
    assert_eq!(order.id, "12");
    assert_eq!(order.product_name, "Moringa");
    assert_eq!(order.product_price, 1200.0);
    assert_eq!(order.status, OrderStatus::Shipped);
  }

  #[test]
  fn test_order_own_snapshot_wins_over_join() {
    let raw = json!({
      "productName": "Old name",
      "productPrice": "90",
      "status": "bogus",
      "products": { "name": "New name", "price": 120 }
    });
    let order = normalize_order(&raw);
    assert_eq!(order.product_name, "Old name");
    assert_eq!(order.product_price, 90.0);
    assert_eq!(order.status, OrderStatus::Pending);
  }

  #[test]
  fn test_normalize_order_is_idempotent() {
    let raw = json!({ "id": "o1", "customer_region": "Oran", "status": "confirmed" });
    let once = normalize_order(&raw);
    let reencoded = serde_json::to_value(&once).unwrap();
    assert_eq!(normalize_order(&reencoded), once);
  }

  #[test]
  fn test_patch_row_only_contains_set_fields() {
    let patch = ProductPatch {
      price: Some(10.0),
      image_url: Some(String::new()),
      ..Default::default()
    };
    let row = product_patch_row(&patch, Utc::now());
    let obj = row.as_object().unwrap();
    assert_eq!(obj.get("price"), Some(&json!(10.0)));
    assert_eq!(obj.get("image_url"), Some(&Value::Null));
    assert!(obj.contains_key("updated_at"));
    assert!(!obj.contains_key("name"));
  }

  #[test]
  fn test_order_row_forces_pending() {
    let product = normalize_product(&remote_product());
    let order = NewOrder {
      product_id: product.id.clone(),
      customer_name: "Ali".into(),
      customer_phone: "0555".into(),
      customer_address: "Somewhere".into(),
      customer_region: "Alger".into(),
      status: Some(OrderStatus::Cancelled),
    };
    let row = order_row(&order, &product);
    assert_eq!(row["status"], "pending");
    assert_eq!(row["product_name"], "Moringa");
    assert_eq!(row["product_price"], 1200.5);
  }
}
