//! Listing parameters shared by both backends.

use crate::model::{Category, Order, OrderStatus, Product};
use crate::remote::RowQuery;

/// One page of a listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page: u32,
  pub limit: u32,
}

impl Page {
  pub fn new(page: u32, limit: u32) -> Self {
    Self {
      page: page.max(1),
      limit: limit.max(1),
    }
  }

  pub fn offset(&self) -> u32 {
    (self.page - 1).saturating_mul(self.limit)
  }

  fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
    items
      .into_iter()
      .skip(self.offset() as usize)
      .take(self.limit as usize)
      .collect()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
  pub category: Option<Category>,
  pub page: Option<Page>,
}

impl ProductQuery {
  pub fn all() -> Self {
    Self::default()
  }

  pub(crate) fn to_row_query(&self) -> RowQuery {
    let mut query = RowQuery::new();
    if let Some(category) = self.category {
      query = query.eq("category", category.as_str());
    }
    if let Some(page) = self.page {
      query = query.range(page.offset(), page.limit);
    }
    query
  }

  /// Same filter, order and window the remote backend applies.
  pub(crate) fn apply(&self, mut products: Vec<Product>) -> Vec<Product> {
    if let Some(category) = self.category {
      products.retain(|p| p.category == category);
    }
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    match self.page {
      Some(page) => page.slice(products),
      None => products,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
  pub status: Option<OrderStatus>,
  pub page: Option<Page>,
}

impl OrderQuery {
  pub fn all() -> Self {
    Self::default()
  }

  pub(crate) fn to_row_query(&self) -> RowQuery {
    let mut query = RowQuery::new();
    if let Some(status) = self.status {
      query = query.eq("status", status.as_str());
    }
    if let Some(page) = self.page {
      query = query.range(page.offset(), page.limit);
    }
    query
  }

  pub(crate) fn apply(&self, mut orders: Vec<Order>) -> Vec<Order> {
    if let Some(status) = self.status {
      orders.retain(|o| o.status == status);
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    match self.page {
      Some(page) => page.slice(orders),
      None => orders,
    }
  }
}
