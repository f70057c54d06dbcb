//! Rating and trust score models

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::order::PaymentStatus;

/// Who rates whom
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "rating_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RatingType {
    BuyerToSeller,
    SellerToBuyer,
}

/// Rating row
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: Uuid,
    pub order_id: Uuid,
    pub rater_id: Uuid,
    pub ratee_id: Uuid,
    pub rating_score: i16,
    pub review_text: Option<String>,
    pub rating_type: RatingType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RatingWithNames {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub rating: Rating,
    pub rater_name: String,
    pub ratee_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingRequest {
    pub order_id: Uuid,
    pub ratee_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating_score: i16,
    #[validate(length(max = 2000))]
    pub review_text: Option<String>,
    pub rating_type: RatingType,
}

/// `?type=received|given`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RatingDirection {
    #[default]
    Received,
    Given,
}

#[derive(Debug, Deserialize, Default)]
pub struct UserRatingsQuery {
    #[serde(rename = "type", default)]
    pub direction: RatingDirection,
}

/// Aggregated reputation of a user
#[derive(Debug, Serialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrustScore {
    pub user_id: Uuid,
    pub average_rating: Decimal,
    pub total_ratings: i32,
    pub positive_ratings: i32,
    pub negative_ratings: i32,
    pub updated_at: DateTime<Utc>,
}

impl TrustScore {
    /// A user nobody has rated yet
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            average_rating: Decimal::ZERO,
            total_ratings: 0,
            positive_ratings: 0,
            negative_ratings: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Trust figures recomputed from a user's received scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustSummary {
    pub average_rating: Decimal,
    pub total_ratings: i32,
    pub positive_ratings: i32,
    pub negative_ratings: i32,
}

impl TrustSummary {
    /// Scores of 4 and up count as positive, 2 and below as negative
    pub fn from_scores(scores: &[i16]) -> Self {
        if scores.is_empty() {
            return Self {
                average_rating: Decimal::ZERO,
                total_ratings: 0,
                positive_ratings: 0,
                negative_ratings: 0,
            };
        }

        let total = scores.len() as i64;
        let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        let average = (Decimal::from(sum) / Decimal::from(total))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Self {
            average_rating: average,
            total_ratings: scores.len() as i32,
            positive_ratings: scores.iter().filter(|s| **s >= 4).count() as i32,
            negative_ratings: scores.iter().filter(|s| **s <= 2).count() as i32,
        }
    }
}

/// The parties and payment state of the order being rated
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct RatedOrder {
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub payment_status: PaymentStatus,
}

/// Whether `rater` may rate `ratee` on `order` with `rating_type`
pub fn check_eligibility(
    order: &RatedOrder,
    rater: Uuid,
    ratee: Uuid,
    rating_type: RatingType,
    already_rated: bool,
) -> Result<(), ApiError> {
    if order.payment_status != PaymentStatus::Paid {
        return Err(ApiError::Validation(
            "Order must be paid before it can be rated".to_string(),
        ));
    }

    let (expected_rater, expected_ratee) = match rating_type {
        RatingType::BuyerToSeller => (order.buyer_id, order.seller_id),
        RatingType::SellerToBuyer => (order.seller_id, order.buyer_id),
    };

    if rater != expected_rater {
        return Err(ApiError::Forbidden(match rating_type {
            RatingType::BuyerToSeller => "Only the buyer can rate the seller".to_string(),
            RatingType::SellerToBuyer => "Only the seller can rate the buyer".to_string(),
        }));
    }
    if ratee != expected_ratee {
        return Err(ApiError::Validation(
            "Ratee must be the other party of the order".to_string(),
        ));
    }
    if already_rated {
        return Err(ApiError::Conflict(
            "Rating already submitted for this order".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid_order() -> RatedOrder {
        RatedOrder {
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            payment_status: PaymentStatus::Paid,
        }
    }

    #[test]
    fn test_buyer_rates_seller() {
        let order = paid_order();
        assert!(check_eligibility(
            &order,
            order.buyer_id,
            order.seller_id,
            RatingType::BuyerToSeller,
            false
        )
        .is_ok());
        assert!(check_eligibility(
            &order,
            order.seller_id,
            order.buyer_id,
            RatingType::SellerToBuyer,
            false
        )
        .is_ok());
    }

    #[test]
    fn test_unpaid_order_cannot_be_rated() {
        for status in [PaymentStatus::Pending, PaymentStatus::Failed] {
            let order = RatedOrder {
                payment_status: status,
                ..paid_order()
            };
            let result = check_eligibility(
                &order,
                order.buyer_id,
                order.seller_id,
                RatingType::BuyerToSeller,
                false,
            );
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let order = paid_order();
        let result = check_eligibility(
            &order,
            order.seller_id,
            order.buyer_id,
            RatingType::BuyerToSeller,
            false,
        );
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let stranger = Uuid::new_v4();
        let result = check_eligibility(
            &order,
            stranger,
            order.buyer_id,
            RatingType::SellerToBuyer,
            false,
        );
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_ratee_must_be_counterpart() {
        let order = paid_order();
        let result = check_eligibility(
            &order,
            order.buyer_id,
            Uuid::new_v4(),
            RatingType::BuyerToSeller,
            false,
        );
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_duplicate_rating_conflicts() {
        let order = paid_order();
        let result = check_eligibility(
            &order,
            order.buyer_id,
            order.seller_id,
            RatingType::BuyerToSeller,
            true,
        );
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_trust_summary() {
        let summary = TrustSummary::from_scores(&[5, 4, 3, 2, 1, 5]);
        assert_eq!(summary.total_ratings, 6);
        assert_eq!(summary.positive_ratings, 3);
        assert_eq!(summary.negative_ratings, 2);
        assert_eq!(summary.average_rating, Decimal::new(333, 2));

        let summary = TrustSummary::from_scores(&[5, 4]);
        assert_eq!(summary.average_rating, Decimal::new(450, 2));

        let empty = TrustSummary::from_scores(&[]);
        assert_eq!(empty.total_ratings, 0);
        assert_eq!(empty.average_rating, Decimal::ZERO);
    }

    #[test]
    fn test_score_range_validated() {
        let request = |score: i16| SubmitRatingRequest {
            order_id: Uuid::new_v4(),
            ratee_id: Uuid::new_v4(),
            rating_score: score,
            review_text: None,
            rating_type: RatingType::BuyerToSeller,
        };
        assert!(request(1).validate().is_ok());
        assert!(request(5).validate().is_ok());
        assert!(request(0).validate().is_err());
        assert!(request(6).validate().is_err());
    }
}
