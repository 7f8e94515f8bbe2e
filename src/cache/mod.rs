//! In-process read cache with time-based expiry.
//!
//! Entries expire purely by age; there is no size bound. Writes clear whole
//! namespaces by key prefix so the next read goes back to a backend.

mod keys;
mod layer;

pub use keys::{QueryKey, ORDERS_PREFIX, PRODUCTS_PREFIX};
pub use layer::{TtlCache, DEFAULT_TTL_SECS};
