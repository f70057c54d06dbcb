//! Shared data models for the ReReadery backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// User model
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub surname: String,
    pub role: UserRole,
    pub status: AccountStatus,
    pub shop_name: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    IndividualSeller,
    StoreOwner,
    StoreStaff,
    Admin,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Account status managed by administrators
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Page/limit query parameters
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Clamp to a sane window and return `(page, limit, offset)`
    pub fn resolve(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        assert_eq!(PageQuery::default().resolve(), (1, 20, 0));
    }

    #[test]
    fn test_page_query_clamps() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(query.resolve(), (1, 100, 0));

        let query = PageQuery {
            page: Some(3),
            limit: Some(10),
        };
        assert_eq!(query.resolve(), (3, 10, 20));
    }

    #[test]
    fn test_page_query_huge_page_saturates() {
        let query = PageQuery {
            page: Some(i64::MAX),
            limit: Some(100),
        };
        assert_eq!(query.resolve(), (i64::MAX, 100, i64::MAX));
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&UserRole::StoreOwner).unwrap(),
            "\"store_owner\""
        );
        let role: UserRole = serde_json::from_str("\"individual_seller\"").unwrap();
        assert_eq!(role, UserRole::IndividualSeller);
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "reader@example.com".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            name: "Ada".to_string(),
            surname: "Reader".to_string(),
            role: UserRole::IndividualSeller,
            status: AccountStatus::Active,
            shop_name: None,
            profile_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"shopName\""));
    }
}
