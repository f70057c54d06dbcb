//! Wishlist route definitions

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wishlist", post(add_to_wishlist).get(get_wishlist))
        .route("/api/wishlist/availability", get(wishlist_availability))
        .route("/api/wishlist/:id", delete(remove_from_wishlist))
}
