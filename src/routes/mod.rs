//! Route definitions for the ReReadery API

mod admin;
mod books;
mod cart;
mod orders;
mod payments;
mod ratings;
mod users;
mod wishlist;

pub use admin::admin_routes;
pub use books::book_routes;
pub use cart::cart_routes;
pub use orders::order_routes;
pub use payments::payment_routes;
pub use ratings::rating_routes;
pub use users::user_routes;
pub use wishlist::wishlist_routes;
