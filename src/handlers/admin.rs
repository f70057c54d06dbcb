//! Admin and moderation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::{
    AdminService, AdminUpdateUserRequest, AdminUserQuery, ContentQuery, DashboardStats,
    FlagContentRequest, FlaggedContent, ModerateContentRequest, UpdateAccountStatusRequest,
};
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{MessageResponse, PaginatedResponse, User};

pub async fn admin_list_users(
    State(service): State<Arc<AdminService>>,
    _admin: AdminUser,
    Query(query): Query<AdminUserQuery>,
) -> Result<Json<PaginatedResponse<User>>, ApiError> {
    Ok(Json(service.list_users(query).await?))
}

pub async fn admin_update_user(
    State(service): State<Arc<AdminService>>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(service.update_user(user_id, request).await?))
}

pub async fn admin_delete_user(
    State(service): State<Arc<AdminService>>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    service.delete_user(admin, user_id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

pub async fn admin_set_user_status(
    State(service): State<Arc<AdminService>>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateAccountStatusRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        service
            .set_user_status(admin, user_id, request.status)
            .await?,
    ))
}

/// Any signed-in user may report content
pub async fn flag_content(
    State(service): State<Arc<AdminService>>,
    user: AuthenticatedUser,
    Json(request): Json<FlagContentRequest>,
) -> Result<(StatusCode, Json<FlaggedContent>), ApiError> {
    let flagged = service.flag_content(user, request).await?;
    Ok((StatusCode::CREATED, Json(flagged)))
}

pub async fn admin_list_content(
    State(service): State<Arc<AdminService>>,
    _admin: AdminUser,
    Query(query): Query<ContentQuery>,
) -> Result<Json<PaginatedResponse<FlaggedContent>>, ApiError> {
    Ok(Json(service.list_flagged(query).await?))
}

pub async fn admin_moderate_content(
    State(service): State<Arc<AdminService>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerateContentRequest>,
) -> Result<Json<FlaggedContent>, ApiError> {
    let decision = request.decision()?;
    Ok(Json(service.moderate(admin, id, decision).await?))
}

pub async fn admin_dashboard_stats(
    State(service): State<Arc<AdminService>>,
    _admin: AdminUser,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(service.dashboard_stats().await?))
}
