//! HTTP surface tests
//!
//! These run against a pool that never connects, so they cover everything
//! decided before the first query: authentication, role checks, request
//! validation, middleware and error mapping.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use rereadery_server::app;
use rereadery_server::middleware::RateLimiter;
use rereadery_server::models::UserRole;

use common::{app_state, bearer, test_config, StubGateway};

fn test_app_with_limit(max_requests: u32) -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy(&config.database_url)
        .expect("lazy pool");

    let state = app_state(pool, Arc::new(StubGateway::default()));
    app(
        state,
        &config,
        RateLimiter::new(max_requests, Duration::from_secs(60)),
    )
}

fn test_app() -> Router {
    test_app_with_limit(1_000)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let response = test_app().oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_cart_requires_token() {
    let response = test_app().oneshot(get("/api/cart", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let response = test_app()
        .oneshot(get("/api/orders", Some("Bearer not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let auth = bearer(Uuid::new_v4(), UserRole::StoreOwner);
    let response = test_app()
        .oneshot(get("/api/admin/dashboard/stats", Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": "mallory@example.com",
            "password": "correct horse battery",
            "name": "Mallory",
            "surname": "Admin",
            "role": "admin"
        }),
    );

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_webhook_without_signature_is_unauthorized() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"type":"payment.succeeded","payload":{}}"#))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_redirect_falls_back_to_error_page() {
    let uri = format!("/api/payments/success?order_id={}", Uuid::new_v4());
    let response = test_app().oneshot(get(&uri, None)).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:5173/payment/error"
    );
}

#[tokio::test]
async fn test_database_errors_are_not_leaked() {
    let response = test_app().oneshot(get("/api/books", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    assert_eq!(body["error"]["message"], "Internal server error");
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let request = Request::builder()
        .uri("/api/cart")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-request-id"], "req-42");
    assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
}

fn get_from(uri: &str, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let app = test_app_with_limit(2);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get_from("/api/cart", "198.51.100.4:40000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(get_from("/api/cart", "198.51.100.4:40001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Another peer has its own window
    let response = app
        .oneshot(get_from("/api/cart", "198.51.100.5:40000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forwarded_header_does_not_evade_limit() {
    let app = test_app_with_limit(1);

    for (forwarded, expected) in [
        ("203.0.113.1", StatusCode::UNAUTHORIZED),
        ("203.0.113.2", StatusCode::TOO_MANY_REQUESTS),
    ] {
        let mut request = get_from("/api/cart", "198.51.100.4:40000");
        request
            .headers_mut()
            .insert("x-forwarded-for", forwarded.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn test_webhook_is_not_rate_limited() {
    let app = test_app_with_limit(1);

    for _ in 0..3 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook")
            .extension(ConnectInfo("198.51.100.9:443".parse::<SocketAddr>().unwrap()))
            .body(Body::from("{}"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_huge_page_number_is_handled() {
    let response = test_app()
        .oneshot(get("/api/books?page=9223372036854775807&limit=100", None))
        .await
        .unwrap();

    // Reaches the (unreachable) database instead of overflowing
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
}

#[tokio::test]
async fn test_account_check_fails_closed() {
    let auth = bearer(Uuid::new_v4(), UserRole::IndividualSeller);
    let response = test_app()
        .oneshot(get("/api/cart", Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
}
