//! Admin and moderation models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{AccountStatus, UserRole};

/// What kind of content a flag points at
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "content_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Book,
    Review,
    Comment,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "moderation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Flagged content row
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedContent {
    pub id: Uuid,
    pub content_type: ContentType,
    pub content_id: Uuid,
    pub author_id: Option<Uuid>,
    pub excerpt: String,
    pub flags: i32,
    pub report_reason: Option<String>,
    pub status: ModerationStatus,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FlagContentRequest {
    pub content_type: ContentType,
    pub content_id: Uuid,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    /// Quoted text; only used for comments, which are not stored here
    #[validate(length(min = 1, max = 500))]
    pub excerpt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModerateContentRequest {
    pub status: ModerationStatus,
}

impl ModerateContentRequest {
    /// Moderators decide; they never put content back into the queue
    pub fn decision(&self) -> Result<ModerationStatus, ApiError> {
        match self.status {
            ModerationStatus::Pending => Err(ApiError::Validation(
                "Status must be approved or rejected".to_string(),
            )),
            decided => Ok(decided),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ContentQuery {
    pub status: Option<ModerationStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminUserQuery {
    pub status: Option<AccountStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub surname: String,
    #[validate(email)]
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub kind: String,
    pub subject_id: Uuid,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_sales: Decimal,
    pub pending_orders: i64,
    pub recent_activities: Vec<RecentActivity>,
}
