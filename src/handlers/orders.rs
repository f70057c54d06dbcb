//! Order handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::order::{
    CollectItemRequest, CreateOrderRequest, CreateOrderResponse, Order, OrderDetails, OrderItem,
    OrderListQuery, OrderService, OrderSummary, UpdateOrderStatusRequest,
};

pub async fn create_order(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let created = service.create_order(user, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Orders the caller placed
pub async fn list_orders(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(service.list_buyer_orders(user, query.status).await?))
}

/// Orders for the caller's listings
pub async fn list_selling_orders(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(service.list_seller_orders(user, query.status).await?))
}

pub async fn get_order(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(service.get_order(user, id).await?))
}

pub async fn update_order_status(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(service.update_status(user, id, request.status).await?))
}

pub async fn collect_order_item(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CollectItemRequest>,
) -> Result<Json<OrderItem>, ApiError> {
    let item = service
        .collect_item(user, id, &request.collection_code)
        .await?;
    Ok(Json(item))
}
