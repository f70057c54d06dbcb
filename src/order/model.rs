//! Order ledger models and the payment state machine

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// Length of an in-person collection code
pub const COLLECTION_CODE_LEN: usize = 6;

/// No 0/O or 1/I, so codes survive being read aloud
const COLLECTION_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Payment status of an order
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[serde(alias = "completed")]
    Paid,
    Failed,
}

/// What applying a status change amounts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// pending → paid | failed
    Advance,
    /// Already in the requested terminal state
    Unchanged,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Status changes only move forward: pending → paid | failed
    pub fn transition_to(&self, next: PaymentStatus) -> Result<Transition, ApiError> {
        match (*self, next) {
            (_, PaymentStatus::Pending) => Err(ApiError::Validation(
                "Orders cannot be moved back to pending".to_string(),
            )),
            (PaymentStatus::Pending, _) => Ok(Transition::Advance),
            (current, next) if current == next => Ok(Transition::Unchanged),
            (current, next) => Err(ApiError::Conflict(format!(
                "Order is already {} and cannot become {}",
                current.as_str(),
                next.as_str()
            ))),
        }
    }

    /// Item status implied by an order status
    pub fn item_status(&self) -> OrderItemStatus {
        match self {
            PaymentStatus::Pending => OrderItemStatus::Pending,
            PaymentStatus::Paid => OrderItemStatus::ReadyForCollection,
            PaymentStatus::Failed => OrderItemStatus::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Line item status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "order_item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    Pending,
    ReadyForCollection,
    Collected,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "delivery_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

/// Order row
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub delivery_method: DeliveryMethod,
    #[serde(skip_serializing)]
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order item row
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub book_id: Uuid,
    pub quantity: i32,
    pub price_per_unit: Decimal,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collection_code: String,
    pub status: OrderItemStatus,
    pub collected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Order item with its book for display
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: OrderItem,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub contact_number: String,
}

/// Order list row with the other party's name
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub counterpart_name: String,
    pub item_count: i64,
}

/// Full order as seen by its buyer or seller
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub buyer_name: String,
    pub seller_name: String,
    pub items: Vec<OrderItemDetail>,
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInput {
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 3, max = 10))]
    pub postal_code: String,
    #[validate(length(min = 7, max = 20))]
    pub contact_number: String,
}

/// `POST /orders` body; prices are always read from the catalog
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(alias = "items")]
    pub books: Vec<OrderBookRequest>,
    pub delivery_method: DeliveryMethod,
    pub shipping_details: Option<ShippingInput>,
}

impl CreateOrderRequest {
    /// Shape checks that need no database access
    pub fn validate_shape(&self) -> Result<Vec<Uuid>, ApiError> {
        if self.books.is_empty() {
            return Err(ApiError::Validation(
                "An order needs at least one book".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(self.books.len());
        for book in &self.books {
            if !seen.insert(book.book_id) {
                return Err(ApiError::Validation(format!(
                    "Book {} appears more than once",
                    book.book_id
                )));
            }
            ids.push(book.book_id);
        }

        match (self.delivery_method, &self.shipping_details) {
            (DeliveryMethod::Delivery, None) => {
                return Err(ApiError::Validation(
                    "Shipping details are required for delivery".to_string(),
                ))
            }
            (DeliveryMethod::Delivery, Some(shipping)) => shipping.validate()?,
            (DeliveryMethod::Pickup, _) => {}
        }

        Ok(ids)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub total_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectItemRequest {
    pub collection_code: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct OrderListQuery {
    pub status: Option<PaymentStatus>,
}

/// Catalog facts about a book being ordered
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderLine {
    pub id: Uuid,
    pub price: Decimal,
    pub seller_id: Uuid,
}

/// The single seller every line belongs to
pub fn single_seller(lines: &[OrderLine]) -> Result<Uuid, ApiError> {
    let first = lines
        .first()
        .ok_or_else(|| ApiError::Validation("An order needs at least one book".to_string()))?;

    if lines.iter().any(|line| line.seller_id != first.seller_id) {
        return Err(ApiError::Validation(
            "All books in an order must come from the same seller".to_string(),
        ));
    }
    Ok(first.seller_id)
}

pub fn order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(|line| line.price).sum()
}

/// `count` collection codes, distinct from each other
pub fn generate_collection_codes<R: Rng>(rng: &mut R, count: usize) -> Vec<String> {
    let mut codes: Vec<String> = Vec::with_capacity(count);
    while codes.len() < count {
        let code: String = (0..COLLECTION_CODE_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..COLLECTION_CODE_ALPHABET.len());
                COLLECTION_CODE_ALPHABET[idx] as char
            })
            .collect();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

/// Canonical form of a code typed in by a seller
pub fn normalize_collection_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line(price: Decimal, seller_id: Uuid) -> OrderLine {
        OrderLine {
            id: Uuid::new_v4(),
            price,
            seller_id,
        }
    }

    #[test]
    fn test_forward_only_transitions() {
        use PaymentStatus::*;

        assert_eq!(Pending.transition_to(Paid).unwrap(), Transition::Advance);
        assert_eq!(Pending.transition_to(Failed).unwrap(), Transition::Advance);
        assert_eq!(Paid.transition_to(Paid).unwrap(), Transition::Unchanged);
        assert_eq!(Failed.transition_to(Failed).unwrap(), Transition::Unchanged);

        assert!(matches!(Paid.transition_to(Failed), Err(ApiError::Conflict(_))));
        assert!(matches!(Failed.transition_to(Paid), Err(ApiError::Conflict(_))));
        assert!(matches!(Paid.transition_to(Pending), Err(ApiError::Validation(_))));
        assert!(matches!(Pending.transition_to(Pending), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_item_status_follows_order() {
        assert_eq!(
            PaymentStatus::Paid.item_status(),
            OrderItemStatus::ReadyForCollection
        );
        assert_eq!(PaymentStatus::Failed.item_status(), OrderItemStatus::Cancelled);
    }

    #[test]
    fn test_completed_is_accepted_as_paid() {
        let request: UpdateOrderStatusRequest =
            serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(request.status, PaymentStatus::Paid);
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"paid\"");
    }

    #[test]
    fn test_total_uses_catalog_prices() {
        let seller = Uuid::new_v4();
        let lines = vec![
            line(Decimal::new(1999, 2), seller),
            line(Decimal::new(999, 2), seller),
        ];
        assert_eq!(order_total(&lines), Decimal::new(2998, 2));
        assert_eq!(single_seller(&lines).unwrap(), seller);
    }

    #[test]
    fn test_mixed_sellers_rejected() {
        let lines = vec![
            line(Decimal::new(500, 2), Uuid::new_v4()),
            line(Decimal::new(500, 2), Uuid::new_v4()),
        ];
        assert!(matches!(single_seller(&lines), Err(ApiError::Validation(_))));
        assert!(single_seller(&[]).is_err());
    }

    #[test]
    fn test_collection_codes_are_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let codes = generate_collection_codes(&mut rng, 50);

        assert_eq!(codes.len(), 50);
        let unique: HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), 50);
        for code in &codes {
            assert_eq!(code.len(), COLLECTION_CODE_LEN);
            assert!(code.bytes().all(|b| COLLECTION_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_normalize_collection_code() {
        assert_eq!(normalize_collection_code("  ab3k9z "), "AB3K9Z");
    }

    #[test]
    fn test_order_shape_validation() {
        let book = Uuid::new_v4();
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "books": [{"bookId": book}, {"bookId": book}],
            "deliveryMethod": "pickup"
        }))
        .unwrap();
        assert!(request.validate_shape().is_err());

        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "items": [{"bookId": book}],
            "deliveryMethod": "delivery"
        }))
        .unwrap();
        assert!(request.validate_shape().is_err());

        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "books": [{"bookId": book}],
            "deliveryMethod": "delivery",
            "shippingDetails": {
                "address": "12 Long Street",
                "city": "Cape Town",
                "postalCode": "8001",
                "contactNumber": "0211234567"
            }
        }))
        .unwrap();
        assert_eq!(request.validate_shape().unwrap(), vec![book]);
    }
}
