//! Rating service layer

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::rating::{
    check_eligibility, RatedOrder, Rating, RatingDirection, RatingWithNames,
    SubmitRatingRequest, TrustScore, TrustSummary,
};

const RATINGS_WITH_NAMES: &str = r#"
    SELECT r.*, rater.name AS rater_name, ratee.name AS ratee_name
    FROM ratings r
    JOIN users rater ON rater.id = r.rater_id
    JOIN users ratee ON ratee.id = r.ratee_id
"#;

/// Rating service
#[derive(Clone)]
pub struct RatingService {
    db_pool: PgPool,
}

impl RatingService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Record a rating and refresh the ratee's trust score atomically
    pub async fn submit_rating(
        &self,
        rater: AuthenticatedUser,
        request: SubmitRatingRequest,
    ) -> Result<Rating, ApiError> {
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let order = sqlx::query_as::<_, RatedOrder>(
            "SELECT buyer_id, seller_id, payment_status FROM orders WHERE id = $1 FOR SHARE",
        )
        .bind(request.order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        let already_rated: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ratings WHERE order_id = $1 AND rating_type = $2)",
        )
        .bind(request.order_id)
        .bind(request.rating_type)
        .fetch_one(&mut *tx)
        .await?;

        check_eligibility(
            &order,
            rater.user_id,
            request.ratee_id,
            request.rating_type,
            already_rated,
        )?;

        let review_text = request
            .review_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        let rating = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (id, order_id, rater_id, ratee_id, rating_score, review_text, rating_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.order_id)
        .bind(rater.user_id)
        .bind(request.ratee_id)
        .bind(request.rating_score)
        .bind(review_text)
        .bind(request.rating_type)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("Rating already submitted for this order".to_string())
            }
            other => other,
        })?;

        refresh_trust_score(&mut tx, request.ratee_id).await?;

        tx.commit().await?;

        tracing::info!(
            rating_id = %rating.id,
            order_id = %rating.order_id,
            ratee_id = %rating.ratee_id,
            score = rating.rating_score,
            "Rating submitted"
        );

        Ok(rating)
    }

    /// Trust score of a user; zeros when nobody has rated them
    pub async fn trust_score(&self, user_id: Uuid) -> Result<TrustScore, ApiError> {
        let score = sqlx::query_as::<_, TrustScore>(
            "SELECT * FROM user_trust_scores WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(score.unwrap_or_else(|| TrustScore::empty(user_id)))
    }

    pub async fn user_ratings(
        &self,
        user_id: Uuid,
        direction: RatingDirection,
    ) -> Result<Vec<RatingWithNames>, ApiError> {
        let column = match direction {
            RatingDirection::Received => "r.ratee_id",
            RatingDirection::Given => "r.rater_id",
        };
        let sql = format!(
            "{} WHERE {} = $1 ORDER BY r.created_at DESC",
            RATINGS_WITH_NAMES, column
        );

        let ratings = sqlx::query_as::<_, RatingWithNames>(&sql)
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(ratings)
    }

    /// Ratings on an order, visible to its two parties
    pub async fn order_ratings(
        &self,
        user: AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<Vec<RatingWithNames>, ApiError> {
        let (buyer_id, seller_id): (Uuid, Uuid) =
            sqlx::query_as("SELECT buyer_id, seller_id FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&self.db_pool)
                .await?
                .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        if user.user_id != buyer_id && user.user_id != seller_id && !user.is_admin() {
            return Err(ApiError::Forbidden(
                "Unauthorized to view these ratings".to_string(),
            ));
        }

        let sql = format!("{} WHERE r.order_id = $1 ORDER BY r.created_at", RATINGS_WITH_NAMES);
        let ratings = sqlx::query_as::<_, RatingWithNames>(&sql)
            .bind(order_id)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(ratings)
    }
}

/// Recompute `user_id`'s trust score from every rating they received
async fn refresh_trust_score(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<TrustSummary, ApiError> {
    // Concurrent ratings of the same user must not overwrite each other's totals
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

    let scores: Vec<i16> = sqlx::query_scalar("SELECT rating_score FROM ratings WHERE ratee_id = $1")
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

    let summary = TrustSummary::from_scores(&scores);

    sqlx::query(
        r#"
        INSERT INTO user_trust_scores
            (user_id, average_rating, total_ratings, positive_ratings, negative_ratings, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            average_rating = EXCLUDED.average_rating,
            total_ratings = EXCLUDED.total_ratings,
            positive_ratings = EXCLUDED.positive_ratings,
            negative_ratings = EXCLUDED.negative_ratings,
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(summary.average_rating)
    .bind(summary.total_ratings)
    .bind(summary.positive_ratings)
    .bind(summary.negative_ratings)
    .execute(&mut **tx)
    .await?;

    Ok(summary)
}
