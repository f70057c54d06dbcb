//! Cart handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::cart::{AddToCartRequest, CartEntry, CartItem, CartService, TimerOutcome, UpdateTimerRequest};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::MessageResponse;

pub async fn add_to_cart(
    State(service): State<Arc<CartService>>,
    user: AuthenticatedUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    let item = service.add_to_cart(user, request.book_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_cart(
    State(service): State<Arc<CartService>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<CartEntry>>, ApiError> {
    Ok(Json(service.list_cart(user).await?))
}

pub async fn remove_from_cart(
    State(service): State<Arc<CartService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    service.remove_from_cart(user, id).await?;
    Ok(Json(MessageResponse::new("Item removed from cart")))
}

pub async fn update_cart_timer(
    State(service): State<Arc<CartService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTimerRequest>,
) -> Result<Json<TimerOutcome>, ApiError> {
    Ok(Json(service.update_timer(user, id, request.status).await?))
}

pub async fn reset_cart_timer(
    State(service): State<Arc<CartService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CartItem>, ApiError> {
    Ok(Json(service.reset_timer(user, id).await?))
}
