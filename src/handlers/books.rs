//! Catalog handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{Book, BookFilter, BookInput, BookListing, CatalogService, SimilarBook};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{MessageResponse, PaginatedResponse};

pub async fn list_books(
    State(service): State<Arc<CatalogService>>,
    Query(filter): Query<BookFilter>,
) -> Result<Json<PaginatedResponse<BookListing>>, ApiError> {
    Ok(Json(service.list_books(filter).await?))
}

pub async fn get_book(
    State(service): State<Arc<CatalogService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookListing>, ApiError> {
    Ok(Json(service.get_book(id).await?))
}

pub async fn create_book(
    State(service): State<Arc<CatalogService>>,
    user: AuthenticatedUser,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = service.create_book(user, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(service): State<Arc<CatalogService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(service.update_book(user, id, input).await?))
}

pub async fn delete_book(
    State(service): State<Arc<CatalogService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    service.delete_book(user, id).await?;
    Ok(Json(MessageResponse::new("Book deleted")))
}

pub async fn similar_books(
    State(service): State<Arc<CatalogService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SimilarBook>>, ApiError> {
    Ok(Json(service.similar_books(id).await?))
}
