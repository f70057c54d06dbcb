//! API handlers for the ReReadery backend
//!
//! Each handler extracts the caller and input, calls one service method and
//! serializes the result.

mod admin;
mod books;
mod cart;
mod health;
mod orders;
mod payments;
mod ratings;
mod users;
mod wishlist;

pub use admin::*;
pub use books::*;
pub use cart::*;
pub use health::*;
pub use orders::*;
pub use payments::*;
pub use ratings::*;
pub use users::*;
pub use wishlist::*;
