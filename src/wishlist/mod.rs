//! Wishlist domain module
//!
//! Books a user wants to keep an eye on, including reservations that lapsed
//! out of their cart.

mod model;
mod service;

pub use model::*;
pub use service::WishlistService;
