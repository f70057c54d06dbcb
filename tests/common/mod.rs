//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use rereadery_server::auth::{generate_access_token, TokenVerifier};
use rereadery_server::config::{Config, Environment, PaymentConfig};
use rereadery_server::models::UserRole;
use rereadery_server::order::OrderService;
use rereadery_server::payment::gateway::{
    Checkout, CheckoutDetails, CheckoutMetadata, CheckoutRequest, CheckoutStatus, GatewayError,
    PaymentGateway,
};
use rereadery_server::payment::PaymentService;
use rereadery_server::state::AppState;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const FRONTEND_URL: &str = "http://localhost:5173";
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://rereadery@127.0.0.1:1/rereadery".to_string(),
        environment: Environment::Development,
        port: 0,
        db_max_connections: 2,
        rate_limit_max_requests: 1_000,
        rate_limit_window: Duration::from_secs(60),
        trust_proxy_headers: false,
        cors_allowed_origins: None,
        log_level: "warn".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        payment: PaymentConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            secret_key: "sk_test_fixture".to_string(),
            webhook_secret: None,
            currency: "ZAR".to_string(),
        },
        cart_hold: Duration::from_secs(15 * 60),
        pending_order_ttl: Duration::from_secs(60 * 60),
        sweep_interval: Duration::from_secs(60),
        bcrypt_cost: 4,
    }
}

pub fn bearer(user_id: Uuid, role: UserRole) -> String {
    let token = generate_access_token(user_id, role, JWT_SECRET, 900).expect("token");
    format!("Bearer {}", token)
}

/// In-memory checkout provider; answers with whatever status the test sets
#[derive(Default)]
pub struct StubGateway {
    status: Mutex<Option<CheckoutStatus>>,
    charged_override: Mutex<Option<i64>>,
    checkouts: Mutex<HashMap<String, CheckoutRequest>>,
}

impl StubGateway {
    pub fn set_status(&self, status: CheckoutStatus) {
        *self.status.lock().unwrap() = Some(status);
    }

    /// Report a different charged amount than the checkout was opened for
    pub fn set_charged(&self, amount: i64) {
        *self.charged_override.lock().unwrap() = Some(amount);
    }

    pub fn opened_amount(&self, checkout_id: &str) -> Option<i64> {
        self.checkouts
            .lock()
            .unwrap()
            .get(checkout_id)
            .map(|request| request.amount)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<Checkout, GatewayError> {
        let id = format!("ch_{}", Uuid::new_v4().simple());
        self.checkouts
            .lock()
            .unwrap()
            .insert(id.clone(), request.clone());

        Ok(Checkout {
            redirect_url: format!("https://checkout.test/{}", id),
            id,
        })
    }

    async fn get_checkout(&self, checkout_id: &str) -> Result<CheckoutDetails, GatewayError> {
        let request = self
            .checkouts
            .lock()
            .unwrap()
            .get(checkout_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                body: "unknown checkout".to_string(),
            })?;

        Ok(CheckoutDetails {
            id: checkout_id.to_string(),
            status: self
                .status
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(CheckoutStatus::Created),
            amount: self.charged_override.lock().unwrap().unwrap_or(request.amount),
            currency: request.currency,
            metadata: CheckoutMetadata {
                order_id: Some(request.order_id),
            },
        })
    }
}

pub fn payment_service(pool: &PgPool, gateway: Arc<StubGateway>) -> PaymentService {
    PaymentService::new(
        OrderService::new(pool.clone()),
        gateway,
        FRONTEND_URL.to_string(),
        "ZAR".to_string(),
        None,
    )
}

/// Same as [`payment_service`] but accepting webhooks signed with [`WEBHOOK_SECRET`]
pub fn webhook_payment_service(pool: &PgPool, gateway: Arc<StubGateway>) -> PaymentService {
    PaymentService::new(
        OrderService::new(pool.clone()),
        gateway,
        FRONTEND_URL.to_string(),
        "ZAR".to_string(),
        Some(WEBHOOK_SECRET.to_string()),
    )
}

pub fn app_state(pool: PgPool, gateway: Arc<StubGateway>) -> AppState {
    let config = test_config();
    AppState::new(
        pool.clone(),
        TokenVerifier::new(JWT_SECRET),
        payment_service(&pool, gateway),
        config.cart_hold,
        config.bcrypt_cost,
    )
}
