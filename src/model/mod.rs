//! Canonical record shapes for the catalog and order book.
//!
//! Everything past the normalization boundary uses these types. Serialized
//! form is camelCase, which is also the shape kept in local storage.

pub mod normalize;
pub mod regions;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use normalize::{normalize_order, normalize_product};

/// Product category, a closed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  #[default]
  Supplement,
  Herbal,
  Tea,
}

impl Category {
  pub const ALL: [Category; 3] = [Category::Supplement, Category::Herbal, Category::Tea];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Supplement => "supplement",
      Category::Herbal => "herbal",
      Category::Tea => "tea",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Category::ALL
      .into_iter()
      .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| format!("unknown category: {}", s))
  }
}

/// Order lifecycle state.
///
/// Orders start `Pending`. The storage layer does not validate transitions;
/// any state can be set from any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  #[default]
  Pending,
  Confirmed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| format!("unknown order status: {}", s))
  }
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: String,
  pub name: String,
  pub description: String,
  pub price: f64,
  pub image_url: Option<String>,
  pub category: Category,
  /// Only tracked by the remote backend
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stock_quantity: Option<u32>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A purchase request against exactly one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: String,
  pub product_id: String,
  pub product_name: String,
  pub product_price: f64,
  pub customer_name: String,
  pub customer_phone: String,
  pub customer_address: String,
  pub customer_region: String,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Why a write was refused before reaching any backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("{0} must not be empty")]
  Empty(&'static str),
  #[error("price must be a non-negative number, got {0}")]
  InvalidPrice(f64),
  #[error("unknown region: {0}")]
  UnknownRegion(String),
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    Err(ValidationError::Empty(field))
  } else {
    Ok(())
  }
}

fn check_price(price: f64) -> Result<(), ValidationError> {
  if price.is_finite() && price >= 0.0 {
    Ok(())
  } else {
    Err(ValidationError::InvalidPrice(price))
  }
}

/// Fields accepted when creating a product. Ids and timestamps are assigned
/// by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price: f64,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub category: Category,
  #[serde(default)]
  pub stock_quantity: Option<u32>,
}

impl NewProduct {
  pub fn validate(&self) -> Result<(), ValidationError> {
    require("name", &self.name)?;
    require("description", &self.description)?;
    check_price(self.price)
  }

  /// Materialize into a local record with a fresh id.
  pub(crate) fn into_product(self, now: DateTime<Utc>) -> Product {
    Product {
      id: uuid::Uuid::new_v4().to_string(),
      name: self.name,
      description: self.description,
      price: self.price,
      image_url: self.image_url.filter(|u| !u.is_empty()),
      category: self.category,
      // Local storage does not track stock
      stock_quantity: None,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Partial product update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<f64>,
  pub image_url: Option<String>,
  pub category: Option<Category>,
  pub stock_quantity: Option<u32>,
}

impl ProductPatch {
  pub fn is_empty(&self) -> bool {
    self == &ProductPatch::default()
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if let Some(name) = &self.name {
      require("name", name)?;
    }
    if let Some(description) = &self.description {
      require("description", description)?;
    }
    if let Some(price) = self.price {
      check_price(price)?;
    }
    Ok(())
  }

  /// Apply to a local record and bump its `updated_at`.
  pub(crate) fn apply(&self, product: &mut Product, now: DateTime<Utc>) {
    if let Some(name) = &self.name {
      product.name = name.clone();
    }
    if let Some(description) = &self.description {
      product.description = description.clone();
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if let Some(image_url) = &self.image_url {
      product.image_url = Some(image_url.clone()).filter(|u| !u.is_empty());
    }
    if let Some(category) = self.category {
      product.category = category;
    }
    if let Some(stock) = self.stock_quantity {
      product.stock_quantity = Some(stock);
    }
    product.updated_at = now;
  }
}

/// Fields accepted when placing an order.
///
/// A caller-supplied `status` is accepted for wire compatibility and always
/// ignored: new orders are `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
  pub product_id: String,
  pub customer_name: String,
  pub customer_phone: String,
  pub customer_address: String,
  pub customer_region: String,
  #[serde(default)]
  pub status: Option<OrderStatus>,
}

impl NewOrder {
  pub fn validate(&self) -> Result<(), ValidationError> {
    require("productId", &self.product_id)?;
    require("customerName", &self.customer_name)?;
    require("customerPhone", &self.customer_phone)?;
    require("customerAddress", &self.customer_address)?;
    require("customerRegion", &self.customer_region)?;
    if !regions::is_known(&self.customer_region) {
      return Err(ValidationError::UnknownRegion(self.customer_region.clone()));
    }
    Ok(())
  }

  /// Materialize into a local record, snapshotting the product.
  pub(crate) fn into_order(self, product: &Product, now: DateTime<Utc>) -> Order {
    Order {
      id: uuid::Uuid::new_v4().to_string(),
      product_id: self.product_id,
      product_name: product.name.clone(),
      product_price: product.price,
      customer_name: self.customer_name,
      customer_phone: self.customer_phone,
      customer_address: self.customer_address,
      customer_region: self.customer_region,
      status: OrderStatus::Pending,
      created_at: now,
      updated_at: now,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn green_tea() -> NewProduct {
    NewProduct {
      name: "Green Tea".to_string(),
      description: "Loose leaf".to_string(),
      price: 500.0,
      image_url: None,
      category: Category::Tea,
      stock_quantity: None,
    }
  }

  #[test]
  fn test_category_parse_is_case_insensitive() {
    assert_eq!("Tea".parse::<Category>(), Ok(Category::Tea));
    assert_eq!(" herbal ".parse::<Category>(), Ok(Category::Herbal));
    assert!("coffee".parse::<Category>().is_err());
  }

  #[test]
  fn test_status_roundtrips_through_str() {
    for status in OrderStatus::ALL {
      assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
    }
  }

  #[test]
  fn test_new_product_validation() {
    assert!(green_tea().validate().is_ok());

    let mut blank = green_tea();
    blank.name = "   ".to_string();
    assert_eq!(blank.validate(), Err(ValidationError::Empty("name")));

    let mut negative = green_tea();
    negative.price = -1.0;
    assert_eq!(negative.validate(), Err(ValidationError::InvalidPrice(-1.0)));

    let mut nan = green_tea();
    nan.price = f64::NAN;
    assert!(nan.validate().is_err());
  }

  #[test]
  fn test_new_product_drops_stock_locally() {
    let mut input = green_tea();
    input.stock_quantity = Some(4);
    input.image_url = Some(String::new());
    let product = input.into_product(Utc::now());
    assert_eq!(product.stock_quantity, None);
    assert_eq!(product.image_url, None);
    assert!(!product.id.is_empty());
    assert_eq!(product.created_at, product.updated_at);
  }

  #[test]
  fn test_patch_apply_touches_only_given_fields() {
    let created = Utc::now() - chrono::Duration::hours(1);
    let mut product = green_tea().into_product(created);
    let patch = ProductPatch {
      price: Some(650.0),
      ..Default::default()
    };
    let now = Utc::now();
    patch.apply(&mut product, now);

    assert_eq!(product.price, 650.0);
    assert_eq!(product.name, "Green Tea");
    assert_eq!(product.updated_at, now);
    assert_eq!(product.created_at, created);
  }

  #[test]
  fn test_new_order_requires_known_region() {
    let order = NewOrder {
      product_id: "p1".to_string(),
      customer_name: "Ali".to_string(),
      customer_phone: "0555000000".to_string(),
      customer_address: "1 Rue Didouche".to_string(),
      customer_region: "Atlantis".to_string(),
      status: None,
    };
    assert_eq!(
      order.validate(),
      Err(ValidationError::UnknownRegion("Atlantis".to_string()))
    );
  }

  #[test]
  fn test_new_order_is_always_pending() {
    let product = green_tea().into_product(Utc::now());
    let order = NewOrder {
      product_id: product.id.clone(),
      customer_name: "Ali".to_string(),
      customer_phone: "0555000000".to_string(),
      customer_address: "1 Rue Didouche".to_string(),
      customer_region: "Alger".to_string(),
      status: Some(OrderStatus::Delivered),
    }
    .into_order(&product, Utc::now());

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.product_name, "Green Tea");
    assert_eq!(order.product_price, 500.0);
  }
}
