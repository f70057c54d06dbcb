//! Admin service layer

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::admin::{
    AdminUpdateUserRequest, AdminUserQuery, ContentQuery, ContentType, DashboardStats,
    FlagContentRequest, FlaggedContent, ModerationStatus, RecentActivity,
};
use crate::catalog::remove_listing;
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{AccountStatus, PageQuery, PaginatedResponse, User};
use crate::users::{delete_user, normalize_email};

/// Back-office service
#[derive(Clone)]
pub struct AdminService {
    db_pool: PgPool,
}

impl AdminService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_users(&self, query: AdminUserQuery) -> Result<PaginatedResponse<User>, ApiError> {
        let (page, limit, offset) = PageQuery {
            page: query.page,
            limit: query.limit,
        }
        .resolve();

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM users WHERE 1=1");
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE 1=1");

        if let Some(status) = query.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.db_pool)
            .await?;

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: users,
            total,
            page,
            limit,
        })
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: AdminUpdateUserRequest,
    ) -> Result<User, ApiError> {
        request.validate()?;

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, surname = $2, email = $3, role = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(request.name.trim())
        .bind(request.surname.trim())
        .bind(normalize_email(&request.email))
        .bind(request.role)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("Email already registered".to_string()),
            other => other,
        })?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn delete_user(&self, AdminUser(admin): AdminUser, user_id: Uuid) -> Result<(), ApiError> {
        if admin.user_id == user_id {
            return Err(ApiError::BadRequest(
                "Administrators cannot delete their own account".to_string(),
            ));
        }

        delete_user(&self.db_pool, user_id).await?;
        tracing::info!(user_id = %user_id, admin_id = %admin.user_id, "User deleted by admin");
        Ok(())
    }

    pub async fn set_user_status(
        &self,
        AdminUser(admin): AdminUser,
        user_id: Uuid,
        status: AccountStatus,
    ) -> Result<User, ApiError> {
        if admin.user_id == user_id && status != AccountStatus::Active {
            return Err(ApiError::BadRequest(
                "Administrators cannot suspend their own account".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user_id, status = ?status, admin_id = %admin.user_id, "Account status changed");
        Ok(user)
    }

    /// Report content; repeat reports raise the count and reopen review
    pub async fn flag_content(
        &self,
        reporter: AuthenticatedUser,
        request: FlagContentRequest,
    ) -> Result<FlaggedContent, ApiError> {
        request.validate()?;

        let (author_id, excerpt): (Option<Uuid>, String) = match request.content_type {
            ContentType::Book => sqlx::query_as("SELECT seller_id, title FROM books WHERE id = $1")
                .bind(request.content_id)
                .fetch_optional(&self.db_pool)
                .await?
                .map(|(author, title): (Uuid, String)| (Some(author), title))
                .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?,
            ContentType::Review => sqlx::query_as(
                "SELECT rater_id, COALESCE(review_text, '') FROM ratings WHERE id = $1",
            )
            .bind(request.content_id)
            .fetch_optional(&self.db_pool)
            .await?
            .map(|(author, text): (Uuid, String)| (Some(author), text))
            .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?,
            ContentType::Comment => (
                None,
                request.excerpt.clone().ok_or_else(|| {
                    ApiError::Validation("An excerpt is required when flagging a comment".to_string())
                })?,
            ),
        };

        let flagged = sqlx::query_as::<_, FlaggedContent>(
            r#"
            INSERT INTO flagged_content
                (id, content_type, content_id, author_id, excerpt, flags, report_reason, status)
            VALUES ($1, $2, $3, $4, $5, 1, $6, 'pending')
            ON CONFLICT (content_type, content_id) DO UPDATE SET
                flags = flagged_content.flags + 1,
                excerpt = EXCLUDED.excerpt,
                report_reason = COALESCE(EXCLUDED.report_reason, flagged_content.report_reason),
                status = 'pending',
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.content_type)
        .bind(request.content_id)
        .bind(author_id)
        .bind(excerpt_of(&excerpt))
        .bind(&request.reason)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(
            flagged_id = %flagged.id,
            reporter_id = %reporter.user_id,
            flags = flagged.flags,
            "Content flagged"
        );

        Ok(flagged)
    }

    pub async fn list_flagged(
        &self,
        query: ContentQuery,
    ) -> Result<PaginatedResponse<FlaggedContent>, ApiError> {
        let (page, limit, offset) = PageQuery {
            page: query.page,
            limit: query.limit,
        }
        .resolve();
        let status = query.status.unwrap_or(ModerationStatus::Pending);

        let items = sqlx::query_as::<_, FlaggedContent>(
            r#"
            SELECT * FROM flagged_content
            WHERE status = $1
            ORDER BY flags DESC, updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flagged_content WHERE status = $1")
            .bind(status)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: items,
            total,
            page,
            limit,
        })
    }

    /// Approve or reject; rejection removes the offending content in the same transaction
    pub async fn moderate(
        &self,
        AdminUser(admin): AdminUser,
        flagged_id: Uuid,
        decision: ModerationStatus,
    ) -> Result<FlaggedContent, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let flagged = sqlx::query_as::<_, FlaggedContent>(
            r#"
            UPDATE flagged_content
            SET status = $1, reviewed_by = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(decision)
        .bind(admin.user_id)
        .bind(flagged_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Flagged content not found".to_string()))?;

        if decision == ModerationStatus::Rejected {
            match flagged.content_type {
                ContentType::Book => remove_listing(&mut tx, flagged.content_id).await?,
                ContentType::Review => {
                    sqlx::query("UPDATE ratings SET review_text = NULL WHERE id = $1")
                        .bind(flagged.content_id)
                        .execute(&mut *tx)
                        .await?;
                }
                ContentType::Comment => {}
            }
        }

        tx.commit().await?;

        tracing::info!(
            flagged_id = %flagged_id,
            decision = ?decision,
            admin_id = %admin.user_id,
            "Content moderated"
        );

        Ok(flagged)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let (total_users, active_users, total_sales, pending_orders): (i64, i64, rust_decimal::Decimal, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM users WHERE status = 'active'),
                    (SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE payment_status = 'paid'),
                    (SELECT COUNT(*) FROM orders WHERE payment_status = 'pending')
                "#,
            )
            .fetch_one(&self.db_pool)
            .await?;

        let recent_activities = sqlx::query_as::<_, RecentActivity>(
            r#"
            SELECT kind, subject_id, description, occurred_at FROM (
                SELECT 'user_registered' AS kind, id AS subject_id,
                       name || ' ' || surname AS description, created_at AS occurred_at
                FROM users
                UNION ALL
                SELECT 'book_listed', id, title, created_at FROM books
                UNION ALL
                SELECT 'order_placed', id, 'Order total ' || total_amount::text, created_at
                FROM orders
            ) activity
            ORDER BY occurred_at DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(DashboardStats {
            total_users,
            active_users,
            total_sales,
            pending_orders,
            recent_activities,
        })
    }
}

/// Keep stored excerpts short
fn excerpt_of(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(MAX_CHARS).collect();
    excerpt.push('…');
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt_of("  short  "), "short");

        let long = "é".repeat(250);
        let excerpt = excerpt_of(&long);
        assert_eq!(excerpt.chars().count(), 201);
        assert!(excerpt.ends_with('…'));
    }
}
