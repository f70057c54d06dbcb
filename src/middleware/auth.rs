//! Authentication middleware
//!
//! Extractors that turn a bearer token into an explicit identity value which
//! handlers pass on to the services.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{JwtError, TokenVerifier};
use crate::error::ApiError;
use crate::models::{AccountStatus, UserRole};

/// Authenticated user extracted from a verified JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthError {
    #[serde(skip)]
    status: StatusCode,
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }

    fn unauthorized(code: &str, message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Verify the bearer token without touching the database
async fn verify_bearer<S>(parts: &mut Parts, state: &S) -> Result<AuthenticatedUser, Response>
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                AuthError::unauthorized(
                    "MISSING_TOKEN",
                    "Authorization header with Bearer token required",
                )
                .into_response()
            })?;

    let verifier = Arc::<TokenVerifier>::from_ref(state);

    let claims = verifier.verify(bearer.token()).map_err(|e| {
        let (code, message) = match e {
            JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
            _ => ("INVALID_TOKEN", "Invalid token"),
        };
        AuthError::unauthorized(code, message).into_response()
    })?;

    let user_id = claims.user_id().map_err(|_| {
        AuthError::unauthorized("INVALID_TOKEN", "Invalid user ID in token").into_response()
    })?;

    Ok(AuthenticatedUser {
        user_id,
        role: claims.role,
    })
}

/// Tokens outlive moderation decisions, so the account is checked on every request
async fn ensure_active(db_pool: &PgPool, user_id: Uuid) -> Result<(), Response> {
    let status: Option<AccountStatus> =
        sqlx::query_scalar("SELECT status FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;

    match status {
        Some(AccountStatus::Active) => Ok(()),
        Some(AccountStatus::Suspended) => Err(AuthError::new(
            StatusCode::FORBIDDEN,
            "ACCOUNT_SUSPENDED",
            "Account is suspended",
        )
        .into_response()),
        Some(AccountStatus::Banned) => Err(AuthError::new(
            StatusCode::FORBIDDEN,
            "ACCOUNT_BANNED",
            "Account is banned",
        )
        .into_response()),
        None => {
            Err(AuthError::unauthorized("INVALID_TOKEN", "Account no longer exists").into_response())
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenVerifier>: FromRef<S>,
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = verify_bearer(parts, state).await?;
        ensure_active(&PgPool::from_ref(state), user.user_id).await?;
        Ok(user)
    }
}

/// Extractor that additionally requires the admin role
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<TokenVerifier>: FromRef<S>,
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = verify_bearer(parts, state).await?;

        // Role comes from the token, so non-admins are turned away before any query
        if !user.is_admin() {
            return Err(
                AuthError::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Admin access required")
                    .into_response(),
            );
        }

        ensure_active(&PgPool::from_ref(state), user.user_id).await?;
        Ok(AdminUser(user))
    }
}
