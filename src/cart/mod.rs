//! Cart reservation tracker
//!
//! A cart item is a soft lock on one physical book. The database allows a
//! single cart row per book; idle reservations lapse into the holder's
//! wishlist.

mod model;
mod service;

pub use model::*;
pub use service::CartService;
