//! ReReadery backend library
//!
//! Secondhand-book marketplace API: catalog, cart reservations, orders with
//! collection codes, hosted-checkout payments, ratings and moderation. The
//! binary in `main.rs` wires configuration and background jobs around
//! [`app`].

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod order;
pub mod payment;
pub mod rating;
pub mod routes;
pub mod state;
pub mod users;
pub mod wishlist;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use config::Config;
use middleware::RateLimiter;
use state::AppState;

/// Build the full HTTP application with its middleware stack
pub fn app(state: AppState, config: &Config, rate_limiter: RateLimiter) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(routes::user_routes())
        .merge(routes::book_routes())
        .merge(routes::cart_routes())
        .merge(routes::wishlist_routes())
        .merge(routes::order_routes())
        .merge(routes::payment_routes())
        .merge(routes::rating_routes())
        .merge(routes::admin_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::security_headers));

    if config.environment.is_production() {
        router = router.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    router
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
}

/// CORS from a comma-separated origin list; permissive when unset
pub fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default().trim();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers(Any)
}
