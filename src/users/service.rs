//! User service layer - registration and self-service account management

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{AccountStatus, User};
use crate::users::{
    normalize_email, ChangePasswordRequest, RegisterRequest, SellerStats, UpdateProfileRequest,
};

/// User service
#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(db_pool: PgPool, bcrypt_cost: u32) -> Self {
        Self {
            db_pool,
            bcrypt_cost,
        }
    }

    /// Create an account
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ApiError> {
        request.validate()?;
        let role = request.resolved_role()?;
        let email = normalize_email(&request.email);

        self.ensure_email_free(&email, None).await?;

        let password_hash = self.hash(request.password.clone()).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, name, surname, role, status, shop_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(password_hash)
        .bind(request.name.trim())
        .bind(request.surname.trim())
        .bind(role)
        .bind(AccountStatus::Active)
        .bind(request.shop_name.as_deref().map(str::trim))
        .fetch_one(&self.db_pool)
        .await
        .map_err(email_conflict)?;

        tracing::info!(user_id = %user.id, role = ?user.role, "User registered");

        Ok(user)
    }

    pub async fn profile(&self, user: AuthenticatedUser) -> Result<User, ApiError> {
        self.get_user(user.user_id).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        user: AuthenticatedUser,
        request: UpdateProfileRequest,
    ) -> Result<User, ApiError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        self.ensure_email_free(&email, Some(user.user_id)).await?;

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, surname = $2, email = $3,
                profile_image = COALESCE($4, profile_image), updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(request.name.trim())
        .bind(request.surname.trim())
        .bind(&email)
        .bind(&request.profile_image)
        .bind(user.user_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(email_conflict)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn change_password(
        &self,
        user: AuthenticatedUser,
        request: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        request.validate()?;

        let current = self.get_user(user.user_id).await?;

        let stored = current.password_hash.clone();
        let candidate = request.current_password.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored))
            .await
            .map_err(|e| ApiError::Internal(format!("Password check failed: {}", e)))?;

        if !matches {
            return Err(ApiError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = self.hash(request.new_password).await?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(user.user_id)
            .execute(&self.db_pool)
            .await?;

        tracing::info!(user_id = %user.user_id, "Password changed");
        Ok(())
    }

    /// Delete the caller's own account
    pub async fn delete_account(&self, user: AuthenticatedUser) -> Result<(), ApiError> {
        delete_user(&self.db_pool, user.user_id).await?;
        tracing::info!(user_id = %user.user_id, "Account deleted");
        Ok(())
    }

    pub async fn seller_stats(&self, user: AuthenticatedUser) -> Result<SellerStats, ApiError> {
        let stats = sqlx::query_as::<_, SellerStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM orders WHERE seller_id = $1) AS total_orders,
                (SELECT COUNT(*) FROM books WHERE seller_id = $1) AS total_books,
                (SELECT COALESCE(SUM(total_amount), 0) FROM orders
                 WHERE seller_id = $1 AND payment_status = 'paid') AS total_revenue
            "#,
        )
        .bind(user.user_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(stats)
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> Result<(), ApiError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE LOWER(email) = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.db_pool)
        .await?;

        if taken {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        Ok(())
    }

    async fn hash(&self, password: String) -> Result<String, ApiError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
    }
}

/// Remove an account; refused while it still has order history
pub(crate) async fn delete_user(db_pool: &PgPool, user_id: Uuid) -> Result<(), ApiError> {
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db_pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict(
                "Account has order history and cannot be deleted".to_string(),
            ),
            other => other,
        })?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(())
}

fn email_conflict(err: sqlx::Error) -> ApiError {
    match ApiError::from(err) {
        ApiError::Conflict(_) => ApiError::Conflict("Email already registered".to_string()),
        other => other,
    }
}
