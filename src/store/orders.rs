//! Order operations.

use chrono::Utc;
use color_eyre::Result;
use tracing::{debug, info, warn};

use super::{OrderQuery, Outcome, Storefront};
use crate::cache::{QueryKey, ORDERS_PREFIX, PRODUCTS_PREFIX};
use crate::local;
use crate::model::normalize::{order_row, status_row, stock_row};
use crate::model::{normalize_order, normalize_product, NewOrder, Order, OrderStatus, Product};
use crate::remote::{with_retry, RemoteBackend, Table};

/// How a remote order placement ended, short of a backend error.
enum Placement {
  Placed(Order),
  /// The referenced product is not in the remote backend
  UnknownProduct,
  /// The product tracks stock and has none left
  OutOfStock,
}

impl Storefront {
  /// List orders, newest first. Never fails; empty when nothing is available.
  pub async fn get_orders(&self, query: &OrderQuery) -> Outcome<Vec<Order>> {
    let key = QueryKey::Orders(query);
    let cache_key = key.cache_key();

    if let Some(orders) = self.cache.get::<Vec<Order>>(&cache_key) {
      debug!("cache hit for {}", key.description());
      return Outcome::from_cache(orders);
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      match remote.select(Table::Orders, &query.to_row_query()).await {
        Ok(rows) => {
          let orders: Vec<Order> = rows.iter().map(normalize_order).collect();
          self.cache.set(&cache_key, &orders);
          self.mirror(&orders).await;
          return Outcome::from_remote(orders);
        }
        Err(e) => {
          warn!(error = %e, "failed to fetch {}, using local storage", key.description());
          degraded = true;
        }
      }
    }

    let orders = query.apply(local::load_orders(self.local()));
    Outcome::from_local(orders, degraded)
  }

  /// Single order by id; `None` when neither backend has it.
  pub async fn get_order(&self, id: &str) -> Outcome<Option<Order>> {
    let key = QueryKey::Order(id);
    let cache_key = key.cache_key();

    if let Some(order) = self.cache.get::<Order>(&cache_key) {
      debug!("cache hit for {}", key.description());
      return Outcome::from_cache(Some(order));
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      match remote.select_one(Table::Orders, id).await {
        Ok(Some(row)) => {
          let order = normalize_order(&row);
          self.cache.set(&cache_key, &order);
          self.mirror(std::slice::from_ref(&order)).await;
          return Outcome::from_remote(Some(order));
        }
        Ok(None) => debug!(id, "order not found remotely, checking local storage"),
        Err(e) => {
          warn!(id, error = %e, "failed to fetch order, using local storage");
          degraded = true;
        }
      }
    }

    let order = local::load_orders(self.local())
      .into_iter()
      .find(|o| o.id == id);
    Outcome::from_local(order, degraded)
  }

  /// Place an order. The new order is always `pending` and snapshots the
  /// product's current name and price.
  ///
  /// Against the remote backend the product must exist there, a product that
  /// tracks stock must have some left, and stock is decremented after the
  /// insert. Local storage does not track stock.
  pub async fn add_order(&self, order: NewOrder) -> Outcome<Option<Order>> {
    if let Err(e) = order.validate() {
      warn!(error = %e, "rejected new order");
      return Outcome::rejected(None);
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      match self.place_remote_order(remote.as_ref(), &order).await {
        Ok(Placement::Placed(created)) => {
          self.cache.invalidate_prefix(ORDERS_PREFIX);
          self.mirror(std::slice::from_ref(&created)).await;
          info!(id = %created.id, product = %created.product_id, "order placed");
          return Outcome::from_remote(Some(created));
        }
        Ok(Placement::OutOfStock) => {
          warn!(product = %order.product_id, "product out of stock, order refused");
          return Outcome::from_remote(None);
        }
        Ok(Placement::UnknownProduct) => {
          warn!(product = %order.product_id, "order references unknown product");
          self.mirror_remove::<Product>(&order.product_id).await;
          self.cache.invalidate_prefix(PRODUCTS_PREFIX);
          return Outcome::from_remote(None);
        }
        Err(e) => {
          warn!(error = %e, "failed to place order remotely, using local storage");
          degraded = true;
        }
      }
    }

    let Some(product) = local::load_products(self.local())
      .into_iter()
      .find(|p| p.id == order.product_id)
    else {
      warn!(product = %order.product_id, "order references unknown product");
      return Outcome::from_local(None, degraded);
    };

    let _guard = self.write_lock.lock().await;
    let mut orders = local::load_orders(self.local());
    let created = order.into_order(&product, Utc::now());
    orders.insert(0, created.clone());

    match local::save_orders(self.local(), &orders) {
      Ok(()) => {
        self.cache.invalidate_prefix(ORDERS_PREFIX);
        info!(id = %created.id, product = %created.product_id, "order placed locally");
        Outcome::from_local(Some(created), degraded)
      }
      Err(e) => {
        warn!(error = %e, "failed to place order locally");
        Outcome::from_local(None, degraded)
      }
    }
  }

  /// Read the product, check stock, insert, then decrement. The three calls
  /// are sequential, not atomic.
  async fn place_remote_order(
    &self,
    remote: &dyn RemoteBackend,
    order: &NewOrder,
  ) -> Result<Placement> {
    let Some(row) = remote.select_one(Table::Products, &order.product_id).await? else {
      return Ok(Placement::UnknownProduct);
    };
    let product = normalize_product(&row);

    if product.stock_quantity == Some(0) {
      return Ok(Placement::OutOfStock);
    }

    let row = order_row(order, &product);
    let stored = with_retry(&self.retry, "insert order", || {
      remote.insert(Table::Orders, &row)
    })
    .await?;
    let created = normalize_order(&stored);

    if let Some(stock) = product.stock_quantity {
      self.decrement_stock(remote, &product, stock).await;
    }

    Ok(Placement::Placed(created))
  }

  /// The order already exists at this point, so a failed decrement is only
  /// logged.
  async fn decrement_stock(&self, remote: &dyn RemoteBackend, product: &Product, stock: u32) {
    let row = stock_row(stock.saturating_sub(1), Utc::now());
    let result = with_retry(&self.retry, "decrement stock", || {
      remote.update(Table::Products, &product.id, &row)
    })
    .await;

    match result {
      Ok(Some(stored)) => {
        self.cache.invalidate_prefix(PRODUCTS_PREFIX);
        self.mirror(&[normalize_product(&stored)]).await;
      }
      Ok(None) => warn!(product = %product.id, "product vanished before stock decrement"),
      Err(e) => warn!(product = %product.id, error = %e, "failed to decrement stock"),
    }
  }

  /// Set an order's status. Any status may follow any other. A remote "not
  /// found" is final, as for product updates.
  pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Outcome<bool> {
    let mut degraded = false;
    if let Some(remote) = &self.remote {
      let row = status_row(status, Utc::now());
      match with_retry(&self.retry, "update order status", || {
        remote.update(Table::Orders, id, &row)
      })
      .await
      {
        Ok(Some(stored)) => {
          let updated = normalize_order(&stored);
          self.cache.invalidate_prefix(ORDERS_PREFIX);
          self.mirror(std::slice::from_ref(&updated)).await;
          info!(id, %status, "order status updated");
          return Outcome::from_remote(true);
        }
        Ok(None) => {
          debug!(id, "order not found remotely, dropping any local copy");
          self.mirror_remove::<Order>(id).await;
          self.cache.invalidate_prefix(ORDERS_PREFIX);
          return Outcome::from_remote(false);
        }
        Err(e) => {
          warn!(id, error = %e, "failed to update order remotely, using local storage");
          degraded = true;
        }
      }
    }

    let _guard = self.write_lock.lock().await;
    let mut orders = local::load_orders(self.local());
    let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
      return Outcome::from_local(false, degraded);
    };
    order.status = status;
    order.updated_at = Utc::now();

    match local::save_orders(self.local(), &orders) {
      Ok(()) => {
        self.cache.invalidate_prefix(ORDERS_PREFIX);
        info!(id, %status, "order status updated locally");
        Outcome::from_local(true, degraded)
      }
      Err(e) => {
        warn!(id, error = %e, "failed to update order locally");
        Outcome::from_local(false, degraded)
      }
    }
  }

  /// Delete an order in any state. Always true once attempted.
  pub async fn delete_order(&self, id: &str) -> Outcome<bool> {
    let mut degraded = false;
    let mut source_remote = false;
    if let Some(remote) = &self.remote {
      match with_retry(&self.retry, "delete order", || remote.delete(Table::Orders, id)).await {
        Ok(()) => source_remote = true,
        Err(e) => {
          warn!(id, error = %e, "failed to delete order remotely, using local storage");
          degraded = true;
        }
      }
    }

    self.mirror_remove::<Order>(id).await;
    self.cache.invalidate_prefix(ORDERS_PREFIX);
    info!(id, "order deleted");

    if source_remote {
      Outcome::from_remote(true)
    } else {
      Outcome::from_local(true, degraded)
    }
  }
}
