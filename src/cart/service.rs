//! Cart service layer - soft reservations with a grace period

use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::cart::{expires_at, is_expired, CartEntry, CartItem, TimerOutcome, TimerStatus};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;

/// Cart service for book reservations
#[derive(Clone)]
pub struct CartService {
    db_pool: PgPool,
    hold: Duration,
}

impl CartService {
    pub fn new(db_pool: PgPool, hold: std::time::Duration) -> Self {
        Self {
            db_pool,
            hold: Duration::from_std(hold).unwrap_or_else(|_| Duration::minutes(15)),
        }
    }

    /// Reserve a book for the caller; first writer wins
    pub async fn add_to_cart(
        &self,
        user: AuthenticatedUser,
        book_id: Uuid,
    ) -> Result<CartItem, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        // Serializes reservations and order creation for this book
        let seller_id: Uuid =
            sqlx::query_scalar("SELECT seller_id FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;

        if seller_id == user.user_id {
            return Err(ApiError::Validation(
                "You cannot reserve your own listing".to_string(),
            ));
        }

        let in_order: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM order_items WHERE book_id = $1 AND status <> 'cancelled')",
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if in_order {
            return Err(ApiError::Conflict(
                "Book is already part of an order".to_string(),
            ));
        }

        let holder: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM cart_items WHERE book_id = $1")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;

        match holder {
            Some(holder) if holder == user.user_id => {
                return Err(ApiError::Conflict("Book is already in your cart".to_string()))
            }
            Some(_) => {
                return Err(ApiError::Conflict(
                    "Book is already reserved by another buyer".to_string(),
                ))
            }
            None => {}
        }

        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (id, user_id, book_id, timer_status, last_activity)
            VALUES ($1, $2, $3, 'active', NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("Book is already reserved by another buyer".to_string())
            }
            other => other,
        })?;

        tx.commit().await?;

        tracing::info!(
            cart_item_id = %item.id,
            book_id = %book_id,
            user_id = %user.user_id,
            "Book reserved"
        );

        Ok(item)
    }

    /// The caller's reservations, oldest first
    pub async fn list_cart(&self, user: AuthenticatedUser) -> Result<Vec<CartEntry>, ApiError> {
        let entries = sqlx::query_as::<_, CartEntry>(
            r#"
            SELECT c.id, c.book_id, b.title, b.author, b.price, b.image,
                   b.condition_rating, b.seller_id, u.name AS seller_name,
                   c.timer_status, c.last_activity
            FROM cart_items c
            JOIN books b ON b.id = c.book_id
            JOIN users u ON u.id = b.seller_id
            WHERE c.user_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(user.user_id)
        .fetch_all(&self.db_pool)
        .await?;

        // The sweeper may not have run yet
        let now = Utc::now();
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.expires_at = expires_at(entry.last_activity, self.hold);
                if is_expired(entry.last_activity, now, self.hold) {
                    entry.timer_status = TimerStatus::Expired;
                }
                entry
            })
            .collect();

        Ok(entries)
    }

    /// Release a reservation owned by the caller
    pub async fn remove_from_cart(
        &self,
        user: AuthenticatedUser,
        cart_item_id: Uuid,
    ) -> Result<(), ApiError> {
        self.ensure_owner(user, cart_item_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(cart_item_id)
            .bind(user.user_id)
            .execute(&self.db_pool)
            .await?;

        tracing::info!(cart_item_id = %cart_item_id, user_id = %user.user_id, "Reservation released");
        Ok(())
    }

    /// Client-reported timer change; `expired` moves the book to the wishlist
    pub async fn update_timer(
        &self,
        user: AuthenticatedUser,
        cart_item_id: Uuid,
        status: TimerStatus,
    ) -> Result<TimerOutcome, ApiError> {
        match status {
            TimerStatus::Active => {
                let item = self.reset_timer(user, cart_item_id).await?;
                Ok(TimerOutcome::Renewed { item })
            }
            TimerStatus::Expired => {
                self.ensure_owner(user, cart_item_id).await?;

                let mut tx = self.db_pool.begin().await?;
                let released = release_to_wishlist(&mut tx, cart_item_id, None).await?;
                tx.commit().await?;

                let (_, book_id) = released
                    .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

                tracing::info!(cart_item_id = %cart_item_id, book_id = %book_id, "Reservation expired into wishlist");

                Ok(TimerOutcome::MovedToWishlist {
                    cart_item_id,
                    book_id,
                })
            }
        }
    }

    /// Refresh activity and revive the reservation
    pub async fn reset_timer(
        &self,
        user: AuthenticatedUser,
        cart_item_id: Uuid,
    ) -> Result<CartItem, ApiError> {
        self.ensure_owner(user, cart_item_id).await?;

        sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET last_activity = NOW(), timer_status = 'active'
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(cart_item_id)
        .bind(user.user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))
    }

    /// Release every reservation idle for longer than the hold period
    pub async fn sweep_expired(&self) -> Result<u64, ApiError> {
        let cutoff = Utc::now() - self.hold;

        let stale: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM cart_items WHERE last_activity < $1")
                .bind(cutoff)
                .fetch_all(&self.db_pool)
                .await?;

        let mut released = 0;
        for cart_item_id in stale {
            let mut tx = self.db_pool.begin().await?;
            if release_to_wishlist(&mut tx, cart_item_id, Some(cutoff))
                .await?
                .is_some()
            {
                released += 1;
            }
            tx.commit().await?;
        }

        if released > 0 {
            tracing::info!(released, "Expired cart reservations moved to wishlists");
        }

        Ok(released)
    }

    async fn ensure_owner(&self, user: AuthenticatedUser, cart_item_id: Uuid) -> Result<(), ApiError> {
        let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM cart_items WHERE id = $1")
            .bind(cart_item_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

        if owner != user.user_id {
            return Err(ApiError::Forbidden(
                "Cart item belongs to another user".to_string(),
            ));
        }
        Ok(())
    }
}

/// Delete a cart item and record its book on the holder's wishlist.
///
/// Both statements run on `tx`, so the caller's commit makes the move
/// visible all at once. With `stale_before` set, items touched since then
/// are left alone. Returns `(user_id, book_id)` of the released item.
async fn release_to_wishlist(
    tx: &mut Transaction<'_, Postgres>,
    cart_item_id: Uuid,
    stale_before: Option<chrono::DateTime<Utc>>,
) -> Result<Option<(Uuid, Uuid)>, ApiError> {
    let released: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        DELETE FROM cart_items
        WHERE id = $1 AND ($2::timestamptz IS NULL OR last_activity < $2)
        RETURNING user_id, book_id
        "#,
    )
    .bind(cart_item_id)
    .bind(stale_before)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((user_id, book_id)) = released else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        INSERT INTO wishlist_items (id, user_id, book_id, added_from_cart)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (user_id, book_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(book_id)
    .execute(&mut **tx)
    .await?;

    Ok(Some((user_id, book_id)))
}
