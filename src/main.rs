//! ReReadery Backend Server
//!
//! Boots the marketplace API: configuration, database, payment gateway,
//! background sweepers and the HTTP server.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use rereadery_server::auth::TokenVerifier;
use rereadery_server::config::Config;
use rereadery_server::middleware::RateLimiter;
use rereadery_server::order::OrderService;
use rereadery_server::payment::{PaymentService, YocoGateway};
use rereadery_server::state::AppState;
use rereadery_server::{app, db, jobs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting ReReadery API");

    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    if config.payment.secret_key.is_empty() {
        tracing::warn!("No payment secret key configured, checkouts will fail");
    }
    if config.payment.webhook_secret.is_none() {
        tracing::warn!("YOCO_WEBHOOK_SECRET not set, payment webhooks will be rejected");
    }

    let gateway = YocoGateway::new(&config.payment).context("Failed to build payment client")?;

    let payment_service = PaymentService::new(
        OrderService::new(db_pool.clone()),
        Arc::new(gateway),
        config.frontend_url.clone(),
        config.payment.currency.clone(),
        config.payment.webhook_secret.clone(),
    );

    let app_state = AppState::new(
        db_pool.clone(),
        TokenVerifier::new(&config.jwt_secret),
        payment_service,
        config.cart_hold,
        config.bcrypt_cost,
    );

    // Background sweepers
    let cart_service = app_state.cart_service.clone();
    let sweep_interval = config.sweep_interval;
    tokio::spawn(async move {
        jobs::cart_expiry_sweeper(cart_service, sweep_interval).await;
        tracing::error!("Cart expiry sweeper exited unexpectedly");
    });

    let payment_service = app_state.payment_service.clone();
    let pending_order_ttl = config.pending_order_ttl;
    tokio::spawn(async move {
        jobs::payment_reconciler(payment_service, sweep_interval, pending_order_ttl).await;
        tracing::error!("Payment reconciler exited unexpectedly");
    });

    let rate_limiter = RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window)
        .with_proxy_headers(config.trust_proxy_headers);
    tokio::spawn(jobs::rate_limiter_cleanup(
        rate_limiter.clone(),
        config.rate_limit_window,
    ));

    let app = app(app_state, &config, rate_limiter);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
