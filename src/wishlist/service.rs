//! Wishlist service layer

use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::wishlist::{WishlistAlert, WishlistEntry, WishlistItem};

/// Wishlist service
#[derive(Clone)]
pub struct WishlistService {
    db_pool: PgPool,
    catalog_service: CatalogService,
}

impl WishlistService {
    pub fn new(db_pool: PgPool, catalog_service: CatalogService) -> Self {
        Self {
            db_pool,
            catalog_service,
        }
    }

    /// Add a book; adding it twice returns the existing row
    pub async fn add(&self, user: AuthenticatedUser, book_id: Uuid) -> Result<WishlistItem, ApiError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&self.db_pool)
            .await?;

        if !exists {
            return Err(ApiError::NotFound("Book not found".to_string()));
        }

        let item = sqlx::query_as::<_, WishlistItem>(
            r#"
            INSERT INTO wishlist_items (id, user_id, book_id, added_from_cart)
            VALUES ($1, $2, $3, FALSE)
            ON CONFLICT (user_id, book_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(book_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(item)
    }

    /// The caller's wishlist, newest first
    pub async fn list(&self, user: AuthenticatedUser) -> Result<Vec<WishlistEntry>, ApiError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(
            r#"
            SELECT w.id, w.book_id, b.title, b.author, b.price, b.image,
                   u.name AS seller_name, w.added_from_cart,
                   EXISTS (SELECT 1 FROM cart_items c WHERE c.book_id = w.book_id) AS is_in_cart,
                   w.created_at
            FROM wishlist_items w
            JOIN books b ON b.id = w.book_id
            JOIN users u ON u.id = b.seller_id
            WHERE w.user_id = $1
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(user.user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(entries)
    }

    pub async fn remove(&self, user: AuthenticatedUser, wishlist_item_id: Uuid) -> Result<(), ApiError> {
        let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM wishlist_items WHERE id = $1")
            .bind(wishlist_item_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Wishlist item not found".to_string()))?;

        if owner != user.user_id {
            return Err(ApiError::Forbidden(
                "Wishlist item belongs to another user".to_string(),
            ));
        }

        sqlx::query("DELETE FROM wishlist_items WHERE id = $1")
            .bind(wishlist_item_id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    /// Wished-for books currently held by another buyer, each with the
    /// closest unreserved alternative
    pub async fn availability(&self, user: AuthenticatedUser) -> Result<Vec<WishlistAlert>, ApiError> {
        let held: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT w.id, w.book_id, b.title
            FROM wishlist_items w
            JOIN books b ON b.id = w.book_id
            WHERE w.user_id = $1
              AND (
                EXISTS (
                    SELECT 1 FROM cart_items c
                    WHERE c.book_id = w.book_id AND c.user_id <> $1
                )
                OR EXISTS (
                    SELECT 1 FROM order_items oi
                    JOIN orders o ON o.id = oi.order_id
                    WHERE oi.book_id = w.book_id
                      AND oi.status <> 'cancelled'
                      AND o.buyer_id <> $1
                )
              )
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(user.user_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut alerts = Vec::with_capacity(held.len());
        for (wishlist_item_id, book_id, title) in held {
            let alternative = self
                .catalog_service
                .similar_books(book_id)
                .await?
                .into_iter()
                .next();

            alerts.push(WishlistAlert {
                wishlist_item_id,
                book_id,
                title,
                alternative,
            });
        }

        Ok(alerts)
    }
}
