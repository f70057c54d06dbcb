//! Payment handlers: checkout creation, provider redirects and webhooks

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::payment::webhook::SignedDelivery;
use crate::payment::{
    CreatePaymentRequest, CreatePaymentResponse, PaymentFailureQuery, PaymentService,
    PaymentSuccessQuery,
};

pub async fn create_payment(
    State(service): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), ApiError> {
    let payment = service.create_payment(user, request.order_id).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Provider success redirect; always answers with a redirect into the frontend
pub async fn payment_success(
    State(service): State<Arc<PaymentService>>,
    Query(query): Query<PaymentSuccessQuery>,
) -> Redirect {
    let target = service
        .handle_success(query.order_id, query.payment_intent_id.as_deref())
        .await;
    Redirect::to(&target)
}

pub async fn payment_failure(
    State(service): State<Arc<PaymentService>>,
    Query(query): Query<PaymentFailureQuery>,
) -> Redirect {
    Redirect::to(&service.handle_failure(query.order_id).await)
}

pub async fn payment_webhook(
    State(service): State<Arc<PaymentService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let delivery = SignedDelivery {
        id: webhook_header(&headers, "webhook-id")?,
        timestamp: webhook_header(&headers, "webhook-timestamp")?,
        signature: webhook_header(&headers, "webhook-signature")?,
    };

    service.handle_webhook(delivery, &body).await?;
    Ok(StatusCode::OK)
}

fn webhook_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", name)))
}
