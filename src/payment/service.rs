//! Payment service layer - checkout creation and server-side verification
//!
//! Redirects and webhooks only tell us *which* checkout to look at. The
//! outcome always comes from the provider's own record of that checkout.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::order::{Order, OrderService, PaymentStatus};
use crate::payment::gateway::{CheckoutDetails, CheckoutRequest, PaymentGateway};
use crate::payment::webhook::{verify_signature, SignedDelivery};
use crate::payment::{to_minor_units, CreatePaymentResponse, WebhookEvent};

/// How to treat a checkout the buyer has not finished yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenCheckout {
    /// Leave the order pending
    Wait,
    /// Give up on it and fail the order
    Fail,
}

/// Payment service for the hosted-checkout flow
pub struct PaymentService {
    order_service: OrderService,
    gateway: Arc<dyn PaymentGateway>,
    frontend_url: String,
    currency: String,
    webhook_secret: Option<String>,
}

impl PaymentService {
    pub fn new(
        order_service: OrderService,
        gateway: Arc<dyn PaymentGateway>,
        frontend_url: String,
        currency: String,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            order_service,
            gateway,
            frontend_url,
            currency,
            webhook_secret,
        }
    }

    /// Open a checkout for a pending order owned by the buyer
    pub async fn create_payment(
        &self,
        buyer: AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<CreatePaymentResponse, ApiError> {
        let order = self.order_service.find_order(order_id).await?;

        if order.buyer_id != buyer.user_id {
            return Err(ApiError::Forbidden(
                "Only the buyer can pay for this order".to_string(),
            ));
        }
        if order.payment_status.is_terminal() {
            return Err(ApiError::Conflict(format!(
                "Order is already {}",
                order.payment_status.as_str()
            )));
        }

        let request = CheckoutRequest {
            amount: to_minor_units(order.total_amount)?,
            currency: self.currency.clone(),
            order_id: order_id.to_string(),
            success_url: format!("{}/payment/success?order_id={}", self.frontend_url, order_id),
            cancel_url: format!("{}/payment/failure?order_id={}", self.frontend_url, order_id),
            failure_url: format!("{}/payment/failure?order_id={}", self.frontend_url, order_id),
        };

        let checkout = self.gateway.create_checkout(&request).await?;
        self.order_service
            .attach_payment_intent(order_id, &checkout.id)
            .await?;

        Ok(CreatePaymentResponse {
            payment_url: checkout.redirect_url,
            order_id,
        })
    }

    /// Success redirect; returns where to send the browser
    pub async fn handle_success(&self, order_id: Uuid, payment_intent_id: Option<&str>) -> String {
        match self.verify_success(order_id, payment_intent_id).await {
            Ok(status) => self.redirect_for(order_id, status),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Payment success verification failed");
                self.error_url()
            }
        }
    }

    async fn verify_success(
        &self,
        order_id: Uuid,
        payment_intent_id: Option<&str>,
    ) -> Result<PaymentStatus, ApiError> {
        let order = self.order_service.find_order(order_id).await?;

        let stored = order.payment_intent_id.as_deref();
        let checkout_id = match (payment_intent_id, stored) {
            (Some(given), Some(stored)) if given != stored => {
                return Err(ApiError::Validation(
                    "Checkout does not belong to this order".to_string(),
                ))
            }
            (Some(given), _) => given.to_string(),
            (None, Some(stored)) => stored.to_string(),
            (None, None) => {
                return Err(ApiError::Validation(
                    "Order has no checkout to verify".to_string(),
                ))
            }
        };

        let details = self.gateway.get_checkout(&checkout_id).await?;
        self.settle(&order, &details, OpenCheckout::Fail).await
    }

    /// Failure redirect; a checkout that in fact succeeded still counts
    pub async fn handle_failure(&self, order_id: Uuid) -> String {
        match self.verify_failure(order_id).await {
            Ok(status) => self.redirect_for(order_id, status),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Payment failure handling failed");
                self.error_url()
            }
        }
    }

    async fn verify_failure(&self, order_id: Uuid) -> Result<PaymentStatus, ApiError> {
        let order = self.order_service.find_order(order_id).await?;

        match order.payment_intent_id.as_deref() {
            Some(checkout_id) => {
                let details = self.gateway.get_checkout(checkout_id).await?;
                self.settle(&order, &details, OpenCheckout::Fail).await
            }
            None => {
                self.order_service
                    .transition(order_id, PaymentStatus::Failed)
                    .await?;
                Ok(PaymentStatus::Failed)
            }
        }
    }

    /// Signed provider notification
    pub async fn handle_webhook(
        &self,
        delivery: SignedDelivery<'_>,
        body: &[u8],
    ) -> Result<(), ApiError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("Webhooks are not configured".to_string()))?;

        verify_signature(secret, &delivery, body, Utc::now().timestamp()).map_err(|e| {
            tracing::warn!(delivery_id = %delivery.id, error = %e, "Rejected webhook");
            ApiError::Unauthorized("Invalid webhook signature".to_string())
        })?;

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Malformed webhook body: {}", e)))?;

        let Some(checkout_id) = event.payload.metadata.checkout_id else {
            tracing::debug!(event_type = %event.event_type, "Webhook without checkout reference ignored");
            return Ok(());
        };

        let order = match self.order_service.find_by_payment_intent(&checkout_id).await {
            Ok(order) => order,
            Err(ApiError::NotFound(_)) => {
                tracing::warn!(checkout_id = %checkout_id, "Webhook for unknown checkout ignored");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let details = self.gateway.get_checkout(&checkout_id).await?;

        match self.settle(&order, &details, OpenCheckout::Wait).await {
            Ok(status) => {
                tracing::info!(
                    order_id = %order.id,
                    event_type = %event.event_type,
                    status = status.as_str(),
                    "Webhook processed"
                );
                Ok(())
            }
            // Acknowledge deliveries that arrive after the order settled differently
            Err(ApiError::Conflict(message)) => {
                tracing::warn!(order_id = %order.id, %message, "Webhook conflicts with settled order");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Settle pending orders older than `cutoff`; returns how many moved
    pub async fn reconcile_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, ApiError> {
        let orders = self.order_service.stale_pending_orders(cutoff).await?;
        let mut settled = 0;

        for order in orders {
            let status = match order.payment_intent_id.as_deref() {
                Some(checkout_id) => match self.gateway.get_checkout(checkout_id).await {
                    Ok(details) => self.settle(&order, &details, OpenCheckout::Fail).await,
                    Err(e) => {
                        tracing::warn!(order_id = %order.id, error = %e, "Could not verify stale order, retrying later");
                        continue;
                    }
                },
                None => self
                    .order_service
                    .transition(order.id, PaymentStatus::Failed)
                    .await
                    .map(|_| PaymentStatus::Failed),
            };

            match status {
                Ok(PaymentStatus::Pending) => {}
                Ok(status) => {
                    tracing::info!(order_id = %order.id, status = status.as_str(), "Stale order reconciled");
                    settled += 1;
                }
                Err(e) => {
                    tracing::error!(order_id = %order.id, error = %e, "Stale order reconciliation failed");
                }
            }
        }

        Ok(settled)
    }

    /// Apply the provider's verdict on `details` to `order`
    async fn settle(
        &self,
        order: &Order,
        details: &CheckoutDetails,
        open: OpenCheckout,
    ) -> Result<PaymentStatus, ApiError> {
        let expected_amount = to_minor_units(order.total_amount)?;
        let next = checkout_verdict(order, details, expected_amount, &self.currency, open)?;

        match next {
            PaymentStatus::Pending => Ok(PaymentStatus::Pending),
            next => {
                self.order_service.transition(order.id, next).await?;
                Ok(next)
            }
        }
    }

    fn redirect_for(&self, order_id: Uuid, status: PaymentStatus) -> String {
        match status {
            PaymentStatus::Paid => format!("{}/dashboard/orders/{}", self.frontend_url, order_id),
            PaymentStatus::Failed => {
                format!("{}/payment/failure?order_id={}", self.frontend_url, order_id)
            }
            PaymentStatus::Pending => self.error_url(),
        }
    }

    fn error_url(&self) -> String {
        format!("{}/payment/error", self.frontend_url)
    }
}

/// Decide what a verified checkout means for an order
fn checkout_verdict(
    order: &Order,
    details: &CheckoutDetails,
    expected_amount: i64,
    currency: &str,
    open: OpenCheckout,
) -> Result<PaymentStatus, ApiError> {
    let order_ref = order.id.to_string();
    let belongs = match details.metadata.order_id.as_deref() {
        Some(reference) => reference == order_ref,
        None => order.payment_intent_id.as_deref() == Some(details.id.as_str()),
    };
    if !belongs {
        return Err(ApiError::Validation(
            "Checkout does not belong to this order".to_string(),
        ));
    }

    if details.status.is_success() {
        if details.amount != expected_amount || !details.currency.eq_ignore_ascii_case(currency) {
            tracing::warn!(
                order_id = %order.id,
                charged = details.amount,
                expected = expected_amount,
                currency = %details.currency,
                "Checkout amount does not match order total"
            );
            return Ok(PaymentStatus::Failed);
        }
        return Ok(PaymentStatus::Paid);
    }

    if details.status.is_open() && open == OpenCheckout::Wait {
        return Ok(PaymentStatus::Pending);
    }

    Ok(PaymentStatus::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::DeliveryMethod;
    use crate::payment::gateway::{CheckoutMetadata, CheckoutStatus};
    use rust_decimal::Decimal;

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            total_amount: Decimal::new(2998, 2),
            payment_status: PaymentStatus::Pending,
            delivery_method: DeliveryMethod::Pickup,
            payment_intent_id: Some("ch_1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn details(order: &Order, status: CheckoutStatus, amount: i64) -> CheckoutDetails {
        CheckoutDetails {
            id: "ch_1".to_string(),
            status,
            amount,
            currency: "ZAR".to_string(),
            metadata: CheckoutMetadata {
                order_id: Some(order.id.to_string()),
            },
        }
    }

    #[test]
    fn test_succeeded_checkout_pays() {
        let order = order();
        let verdict = checkout_verdict(
            &order,
            &details(&order, CheckoutStatus::Succeeded, 2998),
            2998,
            "ZAR",
            OpenCheckout::Fail,
        );
        assert_eq!(verdict.unwrap(), PaymentStatus::Paid);
    }

    #[test]
    fn test_non_succeeded_checkout_fails() {
        let order = order();
        for status in [CheckoutStatus::Failed, CheckoutStatus::Cancelled, CheckoutStatus::Started] {
            let verdict = checkout_verdict(
                &order,
                &details(&order, status, 2998),
                2998,
                "ZAR",
                OpenCheckout::Fail,
            );
            assert_eq!(verdict.unwrap(), PaymentStatus::Failed);
        }
    }

    #[test]
    fn test_open_checkout_can_wait() {
        let order = order();
        let verdict = checkout_verdict(
            &order,
            &details(&order, CheckoutStatus::Processing, 2998),
            2998,
            "ZAR",
            OpenCheckout::Wait,
        );
        assert_eq!(verdict.unwrap(), PaymentStatus::Pending);
    }

    #[test]
    fn test_underpaid_checkout_fails() {
        let order = order();
        let verdict = checkout_verdict(
            &order,
            &details(&order, CheckoutStatus::Completed, 100),
            2998,
            "ZAR",
            OpenCheckout::Fail,
        );
        assert_eq!(verdict.unwrap(), PaymentStatus::Failed);
    }

    #[test]
    fn test_foreign_checkout_rejected() {
        let order = order();
        let mut foreign = details(&order, CheckoutStatus::Succeeded, 2998);
        foreign.metadata.order_id = Some(Uuid::new_v4().to_string());

        let verdict = checkout_verdict(&order, &foreign, 2998, "ZAR", OpenCheckout::Fail);
        assert!(matches!(verdict, Err(ApiError::Validation(_))));
    }
}
