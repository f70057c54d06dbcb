//! Payment route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", post(create_payment))
        .route("/api/payments/success", get(payment_success))
        .route("/api/payments/failure", get(payment_failure))
        .route("/api/payments/webhook", post(payment_webhook))
}
