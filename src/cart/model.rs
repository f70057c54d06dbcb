//! Cart reservation models

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Whether a reservation is still held
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "timer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Active,
    Expired,
}

/// Cart item row; one per reserved book
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub timer_status: TimerStatus,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Cart item joined with its book for display
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub condition_rating: i16,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub timer_status: TimerStatus,
    pub last_activity: DateTime<Utc>,
    #[sqlx(skip)]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTimerRequest {
    pub status: TimerStatus,
}

/// Result of a timer update
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum TimerOutcome {
    /// Reservation kept and its activity refreshed
    Renewed { item: CartItem },
    /// Reservation released into the wishlist
    #[serde(rename_all = "camelCase")]
    MovedToWishlist {
        cart_item_id: Uuid,
        book_id: Uuid,
    },
}

/// When a reservation last touched at `last_activity` lapses
pub fn expires_at(last_activity: DateTime<Utc>, hold: Duration) -> DateTime<Utc> {
    last_activity + hold
}

pub fn is_expired(last_activity: DateTime<Utc>, now: DateTime<Utc>, hold: Duration) -> bool {
    expires_at(last_activity, hold) <= now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let hold = Duration::minutes(15);
        let touched = Utc::now();

        assert!(!is_expired(touched, touched + Duration::minutes(14), hold));
        assert!(is_expired(touched, touched + Duration::minutes(15), hold));
        assert!(is_expired(touched, touched + Duration::hours(2), hold));
    }

    #[test]
    fn test_timer_status_wire_format() {
        let request: UpdateTimerRequest = serde_json::from_str(r#"{"status":"expired"}"#).unwrap();
        assert_eq!(request.status, TimerStatus::Expired);
        assert!(serde_json::from_str::<UpdateTimerRequest>(r#"{"status":"paused"}"#).is_err());
    }

    #[test]
    fn test_timer_outcome_is_tagged() {
        let outcome = TimerOutcome::MovedToWishlist {
            cart_item_id: Uuid::nil(),
            book_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "movedToWishlist");
        assert!(json.get("cartItemId").is_some());
    }
}
