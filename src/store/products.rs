//! Product operations.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{Outcome, ProductQuery, Storefront};
use crate::cache::{QueryKey, PRODUCTS_PREFIX};
use crate::local;
use crate::model::normalize::{product_patch_row, product_row};
use crate::model::{normalize_product, NewProduct, Product, ProductPatch};
use crate::remote::images::is_locally_hosted;
use crate::remote::{with_retry, Table};

impl Storefront {
  /// List products, newest first. Never fails; empty when nothing is available.
  pub async fn get_products(&self, query: &ProductQuery) -> Outcome<Vec<Product>> {
    let key = QueryKey::Products(query);
    let cache_key = key.cache_key();

    if let Some(products) = self.cache.get::<Vec<Product>>(&cache_key) {
      debug!("cache hit for {}", key.description());
      return Outcome::from_cache(products);
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      match remote.select(Table::Products, &query.to_row_query()).await {
        Ok(rows) => {
          let products: Vec<Product> = rows.iter().map(normalize_product).collect();
          self.cache.set(&cache_key, &products);
          self.mirror(&products).await;
          return Outcome::from_remote(products);
        }
        Err(e) => {
          warn!(error = %e, "failed to fetch {}, using local storage", key.description());
          degraded = true;
        }
      }
    }

    let products = query.apply(local::load_products(self.local()));
    Outcome::from_local(products, degraded)
  }

  /// Single product by id; `None` when neither backend has it.
  pub async fn get_product(&self, id: &str) -> Outcome<Option<Product>> {
    let key = QueryKey::Product(id);
    let cache_key = key.cache_key();

    if let Some(product) = self.cache.get::<Product>(&cache_key) {
      debug!("cache hit for {}", key.description());
      return Outcome::from_cache(Some(product));
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      match remote.select_one(Table::Products, id).await {
        Ok(Some(row)) => {
          let product = normalize_product(&row);
          self.cache.set(&cache_key, &product);
          self.mirror(std::slice::from_ref(&product)).await;
          return Outcome::from_remote(Some(product));
        }
        Ok(None) => debug!(id, "product not found remotely, checking local storage"),
        Err(e) => {
          warn!(id, error = %e, "failed to fetch product, using local storage");
          degraded = true;
        }
      }
    }

    let product = local::load_products(self.local())
      .into_iter()
      .find(|p| p.id == id);
    Outcome::from_local(product, degraded)
  }

  /// Create a product. `None` means validation failed or neither backend
  /// accepted the write; no id was allocated in that case.
  pub async fn add_product(&self, product: NewProduct) -> Outcome<Option<Product>> {
    if let Err(e) = product.validate() {
      warn!(error = %e, "rejected new product");
      return Outcome::rejected(None);
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      let row = product_row(&product);
      match with_retry(&self.retry, "insert product", || {
        remote.insert(Table::Products, &row)
      })
      .await
      {
        Ok(stored) => {
          let created = normalize_product(&stored);
          self.cache.invalidate_prefix(PRODUCTS_PREFIX);
          self.mirror(std::slice::from_ref(&created)).await;
          info!(id = %created.id, name = %created.name, "product created");
          return Outcome::from_remote(Some(created));
        }
        Err(e) => {
          warn!(error = %e, "failed to create product remotely, using local storage");
          degraded = true;
        }
      }
    }

    let _guard = self.write_lock.lock().await;
    let mut products = local::load_products(self.local());
    let created = product.into_product(Utc::now());
    products.insert(0, created.clone());

    match local::save_products(self.local(), &products) {
      Ok(()) => {
        self.cache.invalidate_prefix(PRODUCTS_PREFIX);
        info!(id = %created.id, name = %created.name, "product created locally");
        Outcome::from_local(Some(created), degraded)
      }
      Err(e) => {
        warn!(error = %e, "failed to create product locally");
        Outcome::from_local(None, degraded)
      }
    }
  }

  /// Apply a partial update. True iff the product existed and was updated.
  ///
  /// Local storage is only consulted when the remote backend is absent or
  /// failing; a remote "not found" is final.
  pub async fn update_product(&self, id: &str, patch: &ProductPatch) -> Outcome<bool> {
    if let Err(e) = patch.validate() {
      warn!(id, error = %e, "rejected product update");
      return Outcome::rejected(false);
    }

    let mut degraded = false;
    if let Some(remote) = &self.remote {
      let row = product_patch_row(patch, Utc::now());
      match with_retry(&self.retry, "update product", || {
        remote.update(Table::Products, id, &row)
      })
      .await
      {
        Ok(Some(stored)) => {
          let updated = normalize_product(&stored);
          self.cache.invalidate_prefix(PRODUCTS_PREFIX);
          self.mirror(std::slice::from_ref(&updated)).await;
          info!(id, "product updated");
          return Outcome::from_remote(true);
        }
        Ok(None) => {
          debug!(id, "product not found remotely, dropping any local copy");
          self.mirror_remove::<Product>(id).await;
          self.cache.invalidate_prefix(PRODUCTS_PREFIX);
          return Outcome::from_remote(false);
        }
        Err(e) => {
          warn!(id, error = %e, "failed to update product remotely, using local storage");
          degraded = true;
        }
      }
    }

    let _guard = self.write_lock.lock().await;
    let mut products = local::load_products(self.local());
    let Some(product) = products.iter_mut().find(|p| p.id == id) else {
      return Outcome::from_local(false, degraded);
    };
    patch.apply(product, Utc::now());

    match local::save_products(self.local(), &products) {
      Ok(()) => {
        self.cache.invalidate_prefix(PRODUCTS_PREFIX);
        info!(id, "product updated locally");
        Outcome::from_local(true, degraded)
      }
      Err(e) => {
        warn!(id, error = %e, "failed to update product locally");
        Outcome::from_local(false, degraded)
      }
    }
  }

  /// Delete a product. Always true once attempted, including for unknown
  /// ids. Orders referencing it keep their snapshot.
  pub async fn delete_product(&self, id: &str) -> Outcome<bool> {
    let image = self.product_image(id).await;

    let mut degraded = false;
    let mut source_remote = false;
    if let Some(remote) = &self.remote {
      match with_retry(&self.retry, "delete product", || {
        remote.delete(Table::Products, id)
      })
      .await
      {
        Ok(()) => source_remote = true,
        Err(e) => {
          warn!(id, error = %e, "failed to delete product remotely, using local storage");
          degraded = true;
        }
      }
    }

    self.mirror_remove::<Product>(id).await;
    self.cache.invalidate_prefix(PRODUCTS_PREFIX);
    info!(id, "product deleted");

    if let (Some(images), Some(path)) = (&self.images, image) {
      if is_locally_hosted(&path) {
        images.remove(&path);
      }
    }

    if source_remote {
      Outcome::from_remote(true)
    } else {
      Outcome::from_local(true, degraded)
    }
  }

  /// Image reference of a product about to be deleted, from whichever copy
  /// is at hand.
  async fn product_image(&self, id: &str) -> Option<String> {
    if let Some(product) = local::load_products(self.local())
      .into_iter()
      .find(|p| p.id == id)
    {
      return product.image_url;
    }

    let remote = self.remote.as_ref()?;
    match remote.select_one(Table::Products, id).await {
      Ok(row) => row.and_then(|r| normalize_product(&r).image_url),
      Err(e) => {
        debug!(id, error = %e, "could not look up product image");
        None
      }
    }
  }
}
