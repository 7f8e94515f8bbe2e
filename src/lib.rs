//! Product catalog and order intake over a dual-backend data-access layer.
//!
//! [`Storefront`] targets a remote relational backend when one is
//! configured and local durable storage otherwise, caches reads for five
//! minutes, and never surfaces backend errors to its callers.

pub mod auth;
pub mod cache;
pub mod config;
pub mod local;
pub mod logging;
pub mod model;
pub mod remote;
pub mod store;

pub use config::Config;
pub use model::{Category, NewOrder, NewProduct, Order, OrderStatus, Product, ProductPatch};
pub use store::{DataSource, OrderQuery, Outcome, Page, ProductQuery, Storefront, Summary};
