//! Hosted-checkout payment gateway
//!
//! The application never sees card data. It opens a checkout with the
//! provider, sends the buyer to the returned URL, and later asks the
//! provider what actually happened.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::PaymentConfig;
use crate::error::ApiError;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Payment provider is not configured")]
    NotConfigured,
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::ExternalService(err.to_string())
    }
}

/// A checkout to open with the provider
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    pub order_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub failure_url: String,
}

/// A freshly opened checkout
#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    pub id: String,
    #[serde(rename = "redirectUrl", alias = "redirect_url")]
    pub redirect_url: String,
}

/// Provider-side status of a checkout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStatus {
    Created,
    Started,
    Processing,
    Succeeded,
    Completed,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl CheckoutStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckoutStatus::Succeeded | CheckoutStatus::Completed)
    }

    /// Buyer may still complete it
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            CheckoutStatus::Created | CheckoutStatus::Started | CheckoutStatus::Processing
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: Option<String>,
}

/// Authoritative checkout state fetched from the provider
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutDetails {
    pub id: String,
    pub status: CheckoutStatus,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

/// Seam between the payment flow and the provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<Checkout, GatewayError>;

    async fn get_checkout(&self, checkout_id: &str) -> Result<CheckoutDetails, GatewayError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody<'a> {
    amount: i64,
    currency: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
    failure_url: &'a str,
    metadata: CheckoutBodyMetadata<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBodyMetadata<'a> {
    order_id: &'a str,
}

/// Yoco hosted-checkout client
pub struct YocoGateway {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl YocoGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.secret_key.is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        Ok(())
    }

    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for YocoGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<Checkout, GatewayError> {
        self.ensure_configured()?;

        let body = CheckoutBody {
            amount: request.amount,
            currency: &request.currency,
            success_url: &request.success_url,
            cancel_url: &request.cancel_url,
            failure_url: &request.failure_url,
            metadata: CheckoutBodyMetadata {
                order_id: &request.order_id,
            },
        };

        let response = self
            .client
            .post(format!("{}/checkouts", self.api_url))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.order_id)
            .json(&body)
            .send()
            .await?;

        let checkout: Checkout = Self::read(response).await?;
        tracing::info!(checkout_id = %checkout.id, order_id = %request.order_id, "Checkout created");
        Ok(checkout)
    }

    async fn get_checkout(&self, checkout_id: &str) -> Result<CheckoutDetails, GatewayError> {
        self.ensure_configured()?;

        let response = self
            .client
            .get(format!("{}/checkouts/{}", self.api_url, checkout_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_status_parsing() {
        let details: CheckoutDetails = serde_json::from_str(
            r#"{"id":"ch_1","status":"completed","amount":2998,"currency":"ZAR","metadata":{"orderId":"o-1"}}"#,
        )
        .unwrap();
        assert!(details.status.is_success());
        assert_eq!(details.metadata.order_id.as_deref(), Some("o-1"));

        let details: CheckoutDetails = serde_json::from_str(
            r#"{"id":"ch_2","status":"succeeded","amount":100,"currency":"ZAR"}"#,
        )
        .unwrap();
        assert!(details.status.is_success());
        assert!(details.metadata.order_id.is_none());

        let status: CheckoutStatus = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(status, CheckoutStatus::Unknown);
        assert!(!status.is_success());
        assert!(CheckoutStatus::Started.is_open());
    }

    #[test]
    fn test_checkout_accepts_either_url_spelling() {
        let checkout: Checkout =
            serde_json::from_str(r#"{"id":"ch_1","redirectUrl":"https://pay/ch_1"}"#).unwrap();
        assert_eq!(checkout.redirect_url, "https://pay/ch_1");

        let checkout: Checkout =
            serde_json::from_str(r#"{"id":"ch_1","redirect_url":"https://pay/ch_1"}"#).unwrap();
        assert_eq!(checkout.redirect_url, "https://pay/ch_1");
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_refuses() {
        let gateway = YocoGateway::new(&PaymentConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            secret_key: String::new(),
            webhook_secret: None,
            currency: "ZAR".to_string(),
        })
        .unwrap();

        let err = gateway.get_checkout("ch_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }
}
