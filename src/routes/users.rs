//! User route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(register_user))
        .route(
            "/api/users/me",
            get(get_profile).put(update_profile).delete(delete_account),
        )
        .route("/api/users/me/password", put(change_password))
        .route("/api/users/me/seller-stats", get(get_seller_stats))
}
