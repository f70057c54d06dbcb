//! Catalog service layer - browse, search and seller-owned listing mutations

use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::model::escape_like;
use crate::catalog::{Book, BookFilter, BookInput, BookListing, SimilarBook};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{PageQuery, PaginatedResponse};

/// Derived availability of the book aliased `b`
const AVAILABILITY_SQL: &str = r#"
    CASE
        WHEN EXISTS (
            SELECT 1 FROM order_items oi
            WHERE oi.book_id = b.id AND oi.status IN ('ready_for_collection', 'collected')
        ) THEN 'sold'
        WHEN EXISTS (
            SELECT 1 FROM order_items oi
            WHERE oi.book_id = b.id AND oi.status = 'pending'
        ) OR EXISTS (
            SELECT 1 FROM cart_items c WHERE c.book_id = b.id
        ) THEN 'reserved'
        ELSE 'available'
    END::book_availability"#;

const LISTING_SELECT: &str = "SELECT b.*, u.name AS seller_name, u.role AS seller_type, ";

/// Catalog service for book listings
#[derive(Clone)]
pub struct CatalogService {
    db_pool: PgPool,
}

impl CatalogService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Browse listings; sold books are hidden
    pub async fn list_books(
        &self,
        filter: BookFilter,
    ) -> Result<PaginatedResponse<BookListing>, ApiError> {
        let (page, limit, offset) = PageQuery {
            page: filter.page,
            limit: filter.limit,
        }
        .resolve();

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(LISTING_SELECT);
        query_builder.push(AVAILABILITY_SQL);
        query_builder.push(" AS availability FROM books b JOIN users u ON u.id = b.seller_id");
        push_filters(&mut query_builder, &filter);

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM books b JOIN users u ON u.id = b.seller_id");
        push_filters(&mut count_builder, &filter);

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        // order_by() only ever yields allow-listed columns
        query_builder.push(" ORDER BY ");
        query_builder.push(filter.order_by());
        query_builder.push(" LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let books = query_builder
            .build_query_as::<BookListing>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: books,
            total,
            page,
            limit,
        })
    }

    /// Get a single listing with seller information
    pub async fn get_book(&self, id: Uuid) -> Result<BookListing, ApiError> {
        let sql = format!(
            "{}{} AS availability FROM books b JOIN users u ON u.id = b.seller_id WHERE b.id = $1",
            LISTING_SELECT, AVAILABILITY_SQL
        );

        sqlx::query_as::<_, BookListing>(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))
    }

    /// Create a listing owned by the calling seller
    pub async fn create_book(
        &self,
        seller: AuthenticatedUser,
        input: BookInput,
    ) -> Result<Book, ApiError> {
        input.validate()?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                id, isbn, title, author, genre, condition_rating,
                price, image, publication_date, seller_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.isbn.trim())
        .bind(input.title.trim())
        .bind(input.author.trim())
        .bind(input.genre.trim())
        .bind(input.condition_rating)
        .bind(input.price)
        .bind(&input.image)
        .bind(input.publication_date)
        .bind(seller.user_id)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(book_id = %book.id, seller_id = %seller.user_id, "Book listed");

        Ok(book)
    }

    /// Replace a listing's fields; only its seller may do this
    pub async fn update_book(
        &self,
        user: AuthenticatedUser,
        id: Uuid,
        input: BookInput,
    ) -> Result<Book, ApiError> {
        input.validate()?;

        let owner = self.owner_of(id).await?;
        if owner != user.user_id {
            return Err(ApiError::Forbidden(
                "Unauthorized to update this book".to_string(),
            ));
        }

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                isbn = $1, title = $2, author = $3, genre = $4,
                condition_rating = $5, price = $6, image = $7,
                publication_date = $8, updated_at = $9
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(input.isbn.trim())
        .bind(input.title.trim())
        .bind(input.author.trim())
        .bind(input.genre.trim())
        .bind(input.condition_rating)
        .bind(input.price)
        .bind(&input.image)
        .bind(input.publication_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(book)
    }

    /// Delete a listing (its seller or an admin)
    pub async fn delete_book(&self, user: AuthenticatedUser, id: Uuid) -> Result<(), ApiError> {
        let owner = self.owner_of(id).await?;
        if owner != user.user_id && !user.is_admin() {
            return Err(ApiError::Forbidden(
                "Unauthorized to delete this book".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await?;
        remove_listing(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(book_id = %id, user_id = %user.user_id, "Book deleted");
        Ok(())
    }

    /// Up to five unreserved books recommended for `id`
    pub async fn similar_books(&self, id: Uuid) -> Result<Vec<SimilarBook>, ApiError> {
        // 404 for unknown books rather than an empty list
        self.owner_of(id).await?;

        let books = sqlx::query_as::<_, SimilarBook>(
            r#"
            SELECT b.*, r.similarity_score
            FROM book_recommendations r
            JOIN books b ON r.recommended_book_id = b.id
            WHERE r.book_id = $1
              AND NOT EXISTS (SELECT 1 FROM cart_items c WHERE c.book_id = b.id)
              AND NOT EXISTS (
                  SELECT 1 FROM order_items oi
                  WHERE oi.book_id = b.id AND oi.status <> 'cancelled'
              )
            ORDER BY r.similarity_score DESC
            LIMIT 5
            "#,
        )
        .bind(id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(books)
    }

    async fn owner_of(&self, id: Uuid) -> Result<Uuid, ApiError> {
        sqlx::query_scalar::<_, Uuid>("SELECT seller_id FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))
    }
}

/// Delete a listing inside an open transaction, refusing books with any
/// order history; order views keep joining the book row for titles and prices
pub(crate) async fn remove_listing(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<(), ApiError> {
    let in_order: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM order_items WHERE book_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    if in_order {
        return Err(ApiError::Conflict(
            "Book has order history and cannot be removed".to_string(),
        ));
    }

    sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    builder.push(
        r#" WHERE NOT EXISTS (
            SELECT 1 FROM order_items oi
            WHERE oi.book_id = b.id AND oi.status IN ('ready_for_collection', 'collected')
        )"#,
    );

    if let Some(genre) = &filter.genre {
        builder.push(" AND b.genre = ");
        builder.push_bind(genre.clone());
    }
    if let Some(condition) = filter.condition {
        builder.push(" AND b.condition_rating = ");
        builder.push_bind(condition);
    }
    if let Some(min_price) = filter.min_price {
        builder.push(" AND b.price >= ");
        builder.push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        builder.push(" AND b.price <= ");
        builder.push_bind(max_price);
    }
    if let Some(store) = filter.store {
        builder.push(" AND u.role = 'store_owner' AND u.id = ");
        builder.push_bind(store);
    }
    if let Some(location) = filter.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        builder.push(
            r#" AND EXISTS (
                SELECT 1 FROM orders o
                JOIN shipping_details sd ON sd.order_id = o.id
                WHERE o.seller_id = b.seller_id AND sd.postal_code LIKE "#,
        );
        builder.push_bind(format!("{}%", escape_like(location)));
        builder.push(")");
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let term = format!("%{}%", escape_like(search));
        builder.push(" AND (b.title ILIKE ");
        builder.push_bind(term.clone());
        builder.push(" OR b.author ILIKE ");
        builder.push_bind(term.clone());
        builder.push(" OR b.isbn ILIKE ");
        builder.push_bind(term);
        builder.push(")");
    }
}
