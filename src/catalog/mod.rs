//! Catalog domain module
//!
//! Book listings owned by sellers, browse/search, and similar-book lookups.

mod model;
mod service;

pub use model::*;
pub use service::CatalogService;
pub(crate) use service::remove_listing;
