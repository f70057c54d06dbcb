//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::admin::AdminService;
use crate::auth::TokenVerifier;
use crate::cart::CartService;
use crate::catalog::CatalogService;
use crate::order::OrderService;
use crate::payment::PaymentService;
use crate::rating::RatingService;
use crate::users::UserService;
use crate::wishlist::WishlistService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub token_verifier: Arc<TokenVerifier>,
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
    pub wishlist_service: Arc<WishlistService>,
    pub order_service: Arc<OrderService>,
    pub payment_service: Arc<PaymentService>,
    pub rating_service: Arc<RatingService>,
    pub user_service: Arc<UserService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    /// Wire every service over one pool
    ///
    /// The payment service is built by the caller because it owns the
    /// gateway client and the redirect settings.
    pub fn new(
        db_pool: PgPool,
        token_verifier: TokenVerifier,
        payment_service: PaymentService,
        cart_hold: std::time::Duration,
        bcrypt_cost: u32,
    ) -> Self {
        let catalog_service = CatalogService::new(db_pool.clone());

        Self {
            token_verifier: Arc::new(token_verifier),
            cart_service: Arc::new(CartService::new(db_pool.clone(), cart_hold)),
            wishlist_service: Arc::new(WishlistService::new(
                db_pool.clone(),
                catalog_service.clone(),
            )),
            catalog_service: Arc::new(catalog_service),
            order_service: Arc::new(OrderService::new(db_pool.clone())),
            payment_service: Arc::new(payment_service),
            rating_service: Arc::new(RatingService::new(db_pool.clone())),
            user_service: Arc::new(UserService::new(db_pool.clone(), bcrypt_cost)),
            admin_service: Arc::new(AdminService::new(db_pool.clone())),
            db_pool,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<CatalogService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.catalog_service.clone()
    }
}

impl FromRef<AppState> for Arc<CartService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cart_service.clone()
    }
}

impl FromRef<AppState> for Arc<WishlistService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.wishlist_service.clone()
    }
}

impl FromRef<AppState> for Arc<OrderService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.order_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<RatingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rating_service.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.user_service.clone()
    }
}

impl FromRef<AppState> for Arc<AdminService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.admin_service.clone()
    }
}
