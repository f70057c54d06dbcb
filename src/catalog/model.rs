//! Book listing models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::UserRole;

/// Book listing row
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub condition_rating: i16,
    pub price: Decimal,
    pub image: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub seller_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a listing can currently be bought
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "book_availability", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Nobody holds it
    Available,
    /// In someone's cart or a pending order
    Reserved,
    /// Paid for
    Sold,
}

/// Listing as shown to browsers, with seller and availability
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub seller_name: String,
    pub seller_type: UserRole,
    pub availability: Availability,
}

/// Recommended alternative for a book
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SimilarBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub similarity_score: f64,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("price_must_be_positive"));
    }
    if price.scale() > 2 {
        return Err(ValidationError::new("price_has_too_many_decimals"));
    }
    Ok(())
}

/// Create/update payload for a listing
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[validate(length(min = 10, max = 17))]
    pub isbn: String,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub author: String,
    #[validate(length(min = 1, max = 100))]
    pub genre: String,
    #[validate(range(min = 1, max = 5))]
    pub condition_rating: i16,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub image: Option<String>,
    pub publication_date: Option<NaiveDate>,
}

/// Column a browse result may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Price,
    CreatedAt,
    ConditionRating,
}

impl SortColumn {
    /// Map a client-supplied name onto the allow-list, defaulting to creation time
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("price") => SortColumn::Price,
            Some("condition_rating") | Some("conditionRating") => SortColumn::ConditionRating,
            _ => SortColumn::CreatedAt,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Price => "b.price",
            SortColumn::CreatedAt => "b.created_at",
            SortColumn::ConditionRating => "b.condition_rating",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Browse filters (`GET /books`)
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookFilter {
    pub genre: Option<String>,
    pub condition: Option<i16>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub store: Option<Uuid>,
    pub location: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl BookFilter {
    /// Resolved ORDER BY clause; without `sortBy` the newest listings come first
    pub fn order_by(&self) -> String {
        if self.sort_by.is_none() {
            return format!("{} DESC", SortColumn::CreatedAt.as_sql());
        }
        let column = SortColumn::from_param(self.sort_by.as_deref());
        let order = SortOrder::from_param(self.sort_order.as_deref());
        format!("{} {}", column.as_sql(), order.as_sql())
    }
}

/// Escape LIKE wildcards in user input
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(price: Decimal, condition: i16) -> BookInput {
        BookInput {
            isbn: "9780141439518".to_string(),
            title: "Pride and Prejudice".to_string(),
            author: "Jane Austen".to_string(),
            genre: "Classics".to_string(),
            condition_rating: condition,
            price,
            image: None,
            publication_date: None,
        }
    }

    #[test]
    fn test_sort_column_allow_list() {
        assert_eq!(SortColumn::from_param(Some("price")), SortColumn::Price);
        assert_eq!(
            SortColumn::from_param(Some("condition_rating")),
            SortColumn::ConditionRating
        );
        assert_eq!(
            SortColumn::from_param(Some("price; DROP TABLE books")),
            SortColumn::CreatedAt
        );
        assert_eq!(SortColumn::from_param(None), SortColumn::CreatedAt);
    }

    #[test]
    fn test_order_by() {
        let filter = BookFilter::default();
        assert_eq!(filter.order_by(), "b.created_at DESC");

        let filter = BookFilter {
            sort_by: Some("price".to_string()),
            sort_order: Some("DESC".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.order_by(), "b.price DESC");

        let filter = BookFilter {
            sort_by: Some("seller_id".to_string()),
            sort_order: Some("sideways".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.order_by(), "b.created_at ASC");
    }

    #[test]
    fn test_book_input_validation() {
        assert!(input(Decimal::new(1999, 2), 4).validate().is_ok());
        assert!(input(Decimal::ZERO, 4).validate().is_err());
        assert!(input(Decimal::new(-500, 2), 4).validate().is_err());
        assert!(input(Decimal::new(19999, 3), 4).validate().is_err());
        assert!(input(Decimal::new(1999, 2), 0).validate().is_err());
        assert!(input(Decimal::new(1999, 2), 6).validate().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("Tolkien"), "Tolkien");
    }
}
