//! Background jobs
//!
//! Long-running loops spawned at startup. Each one logs its own failures and
//! keeps going; a single bad tick never stops the sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cart::CartService;
use crate::middleware::RateLimiter;
use crate::payment::PaymentService;

/// Releases cart reservations whose hold ran out without client activity
pub async fn cart_expiry_sweeper(cart_service: Arc<CartService>, every: Duration) {
    tracing::info!(interval_secs = every.as_secs(), "Starting cart expiry sweeper");

    loop {
        tokio::time::sleep(every).await;

        match cart_service.sweep_expired().await {
            Ok(0) => {}
            Ok(released) => {
                tracing::info!(released, "Expired cart items moved to wishlists");
            }
            Err(e) => {
                tracing::error!("Error sweeping expired cart items: {}", e);
            }
        }
    }
}

/// Settles orders that stayed pending longer than `pending_ttl`
///
/// Covers buyers who closed the tab on the hosted checkout and webhooks that
/// never arrived.
pub async fn payment_reconciler(
    payment_service: Arc<PaymentService>,
    every: Duration,
    pending_ttl: Duration,
) {
    tracing::info!(interval_secs = every.as_secs(), "Starting payment reconciler");

    let ttl = match chrono::Duration::from_std(pending_ttl) {
        Ok(ttl) => ttl,
        Err(e) => {
            tracing::error!("Invalid pending order TTL, reconciler disabled: {}", e);
            return;
        }
    };

    loop {
        tokio::time::sleep(every).await;

        let cutoff = Utc::now() - ttl;
        match payment_service.reconcile_stale(cutoff).await {
            Ok(0) => {}
            Ok(settled) => {
                tracing::info!(settled, "Stale pending orders reconciled");
            }
            Err(e) => {
                tracing::error!("Error reconciling pending orders: {}", e);
            }
        }
    }
}

/// Drops rate-limit windows that have elapsed so the map stays small
pub async fn rate_limiter_cleanup(rate_limiter: RateLimiter, every: Duration) {
    loop {
        tokio::time::sleep(every).await;
        rate_limiter.cleanup().await;
    }
}
