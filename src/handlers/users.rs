//! User account handlers

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{MessageResponse, User};
use crate::users::{
    ChangePasswordRequest, RegisterRequest, RegisterResponse, SellerStats, UpdateProfileRequest,
    UserService,
};

pub async fn register_user(
    State(service): State<Arc<UserService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = service.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

pub async fn get_profile(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(service.profile(user).await?))
}

pub async fn update_profile(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(service.update_profile(user, request).await?))
}

pub async fn change_password(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service.change_password(user, request).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

pub async fn delete_account(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    service.delete_account(user).await?;
    Ok(Json(MessageResponse::new("Account deleted")))
}

pub async fn get_seller_stats(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
) -> Result<Json<SellerStats>, ApiError> {
    Ok(Json(service.seller_stats(user).await?))
}
