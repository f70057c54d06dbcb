//! Wishlist handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::MessageResponse;
use crate::wishlist::{
    AddToWishlistRequest, WishlistAlert, WishlistEntry, WishlistItem, WishlistService,
};

pub async fn add_to_wishlist(
    State(service): State<Arc<WishlistService>>,
    user: AuthenticatedUser,
    Json(request): Json<AddToWishlistRequest>,
) -> Result<(StatusCode, Json<WishlistItem>), ApiError> {
    let item = service.add(user, request.book_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_wishlist(
    State(service): State<Arc<WishlistService>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<WishlistEntry>>, ApiError> {
    Ok(Json(service.list(user).await?))
}

pub async fn remove_from_wishlist(
    State(service): State<Arc<WishlistService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    service.remove(user, id).await?;
    Ok(Json(MessageResponse::new("Item removed from wishlist")))
}

/// Wishlisted books someone else has reserved, with an alternative for each
pub async fn wishlist_availability(
    State(service): State<Arc<WishlistService>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<WishlistAlert>>, ApiError> {
    Ok(Json(service.availability(user).await?))
}
