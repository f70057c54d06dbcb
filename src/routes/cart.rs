//! Cart route definitions

use axum::{
    routing::{delete, patch, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", post(add_to_cart).get(get_cart))
        .route("/api/cart/:id", delete(remove_from_cart))
        .route("/api/cart/:id/timer", patch(update_cart_timer))
        .route("/api/cart/:id/timer/reset", post(reset_cart_timer))
}
