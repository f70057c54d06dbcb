//! Payment request/response types and money helpers

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub payment_url: String,
    pub order_id: Uuid,
}

/// Query string of the provider's success redirect
#[derive(Debug, Deserialize)]
pub struct PaymentSuccessQuery {
    pub order_id: Uuid,
    pub payment_intent_id: Option<String>,
}

/// Query string of the provider's failure redirect
#[derive(Debug, Deserialize)]
pub struct PaymentFailureQuery {
    pub order_id: Uuid,
}

/// Provider webhook envelope; only the checkout reference is trusted
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: WebhookMetadata,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookMetadata {
    #[serde(rename = "checkoutId", alias = "checkout_id")]
    pub checkout_id: Option<String>,
}

/// Convert a decimal amount to integer minor units (cents).
///
/// Rounds half to even so repeated conversions do not drift in either
/// direction.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ApiError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .ok_or_else(|| ApiError::Validation(format!("Amount {} is out of range", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(2998, 2)).unwrap(), 2998);
        assert_eq!(to_minor_units(Decimal::new(10, 0)).unwrap(), 1000);
        assert_eq!(to_minor_units(Decimal::new(19995, 3)).unwrap(), 2000);
        assert_eq!(to_minor_units(Decimal::new(19985, 3)).unwrap(), 1998);
        assert_eq!(to_minor_units(Decimal::new(1, 3)).unwrap(), 0);
    }

    #[test]
    fn test_webhook_event_parsing() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{
                "id": "evt_1",
                "type": "payment.succeeded",
                "payload": {
                    "id": "p_123",
                    "amount": 2998,
                    "metadata": {"checkoutId": "ch_abc"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.event_type, "payment.succeeded");
        assert_eq!(event.payload.metadata.checkout_id.as_deref(), Some("ch_abc"));
    }

    #[test]
    fn test_success_query_without_intent() {
        let query: PaymentSuccessQuery = serde_json::from_value(serde_json::json!({
            "order_id": Uuid::nil()
        }))
        .unwrap();
        assert!(query.payment_intent_id.is_none());
    }
}
