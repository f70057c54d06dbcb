//! Account request and response models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::UserRole;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub surname: String,
    #[serde(alias = "userType")]
    pub role: Option<UserRole>,
    #[validate(length(min = 1, max = 150))]
    pub shop_name: Option<String>,
}

impl RegisterRequest {
    /// Role the account will get; admins are never self-registered
    pub fn resolved_role(&self) -> Result<UserRole, ApiError> {
        let role = self.role.unwrap_or(UserRole::IndividualSeller);
        if role.is_admin() {
            return Err(ApiError::Validation(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }
        if role == UserRole::StoreOwner && self.shop_name.is_none() {
            return Err(ApiError::Validation(
                "Store owners must provide a shop name".to_string(),
            ));
        }
        Ok(role)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub surname: String,
    #[validate(email)]
    pub email: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    pub total_orders: i64,
    pub total_books: i64,
    pub total_revenue: Decimal,
}

/// E-mail addresses are compared case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: Option<UserRole>, shop_name: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            email: "reader@example.com".to_string(),
            password: "correct horse".to_string(),
            name: "Ada".to_string(),
            surname: "Reader".to_string(),
            role,
            shop_name: shop_name.map(str::to_string),
        }
    }

    #[test]
    fn test_default_role() {
        assert_eq!(
            register(None, None).resolved_role().unwrap(),
            UserRole::IndividualSeller
        );
    }

    #[test]
    fn test_admin_cannot_self_register() {
        assert!(register(Some(UserRole::Admin), None).resolved_role().is_err());
    }

    #[test]
    fn test_store_owner_needs_shop() {
        assert!(register(Some(UserRole::StoreOwner), None).resolved_role().is_err());
        assert_eq!(
            register(Some(UserRole::StoreOwner), Some("Second Chapter"))
                .resolved_role()
                .unwrap(),
            UserRole::StoreOwner
        );
    }

    #[test]
    fn test_register_validation() {
        assert!(register(None, None).validate().is_ok());

        let mut request = register(None, None);
        request.email = "not-an-email".to_string();
        assert!(request.validate().is_err());

        let mut request = register(None, None);
        request.password = "short".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_user_type_alias() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "shop@example.com",
            "password": "long enough",
            "name": "Sam",
            "surname": "Shelf",
            "userType": "store_staff"
        }))
        .unwrap();
        assert_eq!(request.role, Some(UserRole::StoreStaff));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
