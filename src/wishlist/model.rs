//! Wishlist models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::SimilarBook;

/// Wishlist row
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub added_from_cart: bool,
    pub created_at: DateTime<Utc>,
}

/// Wishlist row joined with its book
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub seller_name: String,
    pub added_from_cart: bool,
    /// Someone currently holds the book in a cart
    pub is_in_cart: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistRequest {
    pub book_id: Uuid,
}

/// A wished-for book that someone else holds, with a suggestion
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistAlert {
    pub wishlist_item_id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub alternative: Option<SimilarBook>,
}
