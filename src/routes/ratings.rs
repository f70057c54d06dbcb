//! Rating route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ratings", post(submit_rating))
        .route("/api/ratings/user/:id", get(get_user_ratings))
        .route("/api/ratings/order/:id", get(get_order_ratings))
        .route("/api/ratings/trust/:id", get(get_trust_score))
}
