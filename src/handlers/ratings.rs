//! Rating handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::rating::{
    Rating, RatingService, RatingWithNames, SubmitRatingRequest, TrustScore, UserRatingsQuery,
};

pub async fn submit_rating(
    State(service): State<Arc<RatingService>>,
    user: AuthenticatedUser,
    Json(request): Json<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<Rating>), ApiError> {
    let rating = service.submit_rating(user, request).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// `?type=received` (default) or `?type=given`
pub async fn get_user_ratings(
    State(service): State<Arc<RatingService>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<UserRatingsQuery>,
) -> Result<Json<Vec<RatingWithNames>>, ApiError> {
    Ok(Json(service.user_ratings(user_id, query.direction).await?))
}

pub async fn get_order_ratings(
    State(service): State<Arc<RatingService>>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<RatingWithNames>>, ApiError> {
    Ok(Json(service.order_ratings(user, order_id).await?))
}

pub async fn get_trust_score(
    State(service): State<Arc<RatingService>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TrustScore>, ApiError> {
    Ok(Json(service.trust_score(user_id).await?))
}
