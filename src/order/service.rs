//! Order service layer - creation, lookup and status transitions

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::order::{
    generate_collection_codes, normalize_collection_code, order_total, single_seller,
    CreateOrderRequest, CreateOrderResponse, DeliveryMethod, Order, OrderDetails,
    OrderItem, OrderItemDetail, OrderItemStatus, OrderLine, OrderSummary, PaymentStatus,
    ShippingDetails, Transition,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderWithParties {
    #[sqlx(flatten)]
    order: Order,
    buyer_name: String,
    seller_name: String,
}

/// Which side of the order a listing is for
#[derive(Debug, Clone, Copy)]
enum Side {
    Buyer,
    Seller,
}

impl Side {
    fn own_column(&self) -> &'static str {
        match self {
            Side::Buyer => "o.buyer_id",
            Side::Seller => "o.seller_id",
        }
    }

    fn counterpart_column(&self) -> &'static str {
        match self {
            Side::Buyer => "o.seller_id",
            Side::Seller => "o.buyer_id",
        }
    }
}

/// Order service for the purchase ledger
#[derive(Clone)]
pub struct OrderService {
    db_pool: PgPool,
}

impl OrderService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Create a pending order and its items in one transaction
    pub async fn create_order(
        &self,
        buyer: AuthenticatedUser,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ApiError> {
        let mut book_ids = request.validate_shape()?;
        // Lock in a stable order so concurrent checkouts cannot deadlock
        book_ids.sort();

        let mut tx = self.db_pool.begin().await?;

        let lines = sqlx::query_as::<_, OrderLine>(
            "SELECT id, price, seller_id FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&book_ids)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(missing) = book_ids
            .iter()
            .find(|id| !lines.iter().any(|line| line.id == **id))
        {
            return Err(ApiError::NotFound(format!("Book {} not found", missing)));
        }

        let seller_id = single_seller(&lines)?;
        if seller_id == buyer.user_id {
            return Err(ApiError::Validation(
                "You cannot buy your own listing".to_string(),
            ));
        }

        // The buyer's own cart rows are the reservation being checked out
        let held: Option<Uuid> = sqlx::query_scalar(
            "SELECT book_id FROM cart_items WHERE book_id = ANY($1) AND user_id <> $2 LIMIT 1",
        )
        .bind(&book_ids)
        .bind(buyer.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(book_id) = held {
            return Err(ApiError::Conflict(format!(
                "Book {} is reserved by another buyer",
                book_id
            )));
        }

        let ordered: Option<Uuid> = sqlx::query_scalar(
            "SELECT book_id FROM order_items WHERE book_id = ANY($1) AND status <> 'cancelled' LIMIT 1",
        )
        .bind(&book_ids)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(book_id) = ordered {
            return Err(ApiError::Conflict(format!(
                "Book {} is already part of an order",
                book_id
            )));
        }

        let total_amount = order_total(&lines);
        let order_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, seller_id, total_amount, payment_status, delivery_method)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id)
        .bind(buyer.user_id)
        .bind(seller_id)
        .bind(total_amount)
        .bind(PaymentStatus::Pending)
        .bind(request.delivery_method)
        .execute(&mut *tx)
        .await?;

        let codes = generate_collection_codes(&mut rand::thread_rng(), lines.len());

        for (line, code) in lines.iter().zip(codes) {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, book_id, quantity, price_per_unit, collection_code, status)
                VALUES ($1, $2, $3, 1, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(line.id)
            .bind(line.price)
            .bind(code)
            .bind(OrderItemStatus::Pending)
            .execute(&mut *tx)
            .await
            .map_err(|e| match ApiError::from(e) {
                ApiError::Conflict(_) => ApiError::Conflict(format!(
                    "Book {} is already part of an order",
                    line.id
                )),
                other => other,
            })?;
        }

        if let (DeliveryMethod::Delivery, Some(shipping)) =
            (request.delivery_method, &request.shipping_details)
        {
            sqlx::query(
                r#"
                INSERT INTO shipping_details (id, order_id, address, city, postal_code, contact_number)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(shipping.address.trim())
            .bind(shipping.city.trim())
            .bind(shipping.postal_code.trim())
            .bind(shipping.contact_number.trim())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            buyer_id = %buyer.user_id,
            seller_id = %seller_id,
            total_amount = %total_amount,
            items = lines.len(),
            "Order created"
        );

        Ok(CreateOrderResponse {
            order_id,
            total_amount,
        })
    }

    pub async fn list_buyer_orders(
        &self,
        user: AuthenticatedUser,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<OrderSummary>, ApiError> {
        self.list_orders(user, status, Side::Buyer).await
    }

    pub async fn list_seller_orders(
        &self,
        user: AuthenticatedUser,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<OrderSummary>, ApiError> {
        self.list_orders(user, status, Side::Seller).await
    }

    async fn list_orders(
        &self,
        user: AuthenticatedUser,
        status: Option<PaymentStatus>,
        side: Side,
    ) -> Result<Vec<OrderSummary>, ApiError> {
        let sql = format!(
            r#"
            SELECT o.*, u.name AS counterpart_name,
                   (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS item_count
            FROM orders o
            JOIN users u ON u.id = {}
            WHERE {} = $1 AND ($2::payment_status IS NULL OR o.payment_status = $2)
            ORDER BY o.created_at DESC
            "#,
            side.counterpart_column(),
            side.own_column()
        );

        let orders = sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(user.user_id)
            .bind(status)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(orders)
    }

    /// Order with items and shipping; only its parties (and admins) can see it
    pub async fn get_order(
        &self,
        user: AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<OrderDetails, ApiError> {
        let row = sqlx::query_as::<_, OrderWithParties>(
            r#"
            SELECT o.*, b.name AS buyer_name, s.name AS seller_name
            FROM orders o
            JOIN users b ON b.id = o.buyer_id
            JOIN users s ON s.id = o.seller_id
            WHERE o.id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        let is_buyer = row.order.buyer_id == user.user_id;
        if !is_buyer && row.order.seller_id != user.user_id && !user.is_admin() {
            return Err(ApiError::NotFound("Order not found".to_string()));
        }

        let mut items = sqlx::query_as::<_, OrderItemDetail>(
            r#"
            SELECT oi.*, b.title, b.author, b.image
            FROM order_items oi
            JOIN books b ON b.id = oi.book_id
            WHERE oi.order_id = $1
            ORDER BY oi.created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db_pool)
        .await?;

        for detail in &mut items {
            if !code_visible(is_buyer, detail.item.status) {
                detail.item.collection_code.clear();
            }
        }

        let shipping_details = sqlx::query_as::<_, ShippingDetails>(
            "SELECT * FROM shipping_details WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(OrderDetails {
            order: row.order,
            buyer_name: row.buyer_name,
            seller_name: row.seller_name,
            items,
            shipping_details,
        })
    }

    /// Seller-driven status change through the same state machine as payments
    pub async fn update_status(
        &self,
        seller: AuthenticatedUser,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Order, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let owner: Uuid = sqlx::query_scalar("SELECT seller_id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        if owner != seller.user_id {
            return Err(ApiError::Forbidden(
                "Unauthorized to update this order".to_string(),
            ));
        }

        apply_transition(&mut tx, order_id, status).await?;

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    /// Redeem a collection code at handover
    pub async fn collect_item(
        &self,
        seller: AuthenticatedUser,
        order_id: Uuid,
        collection_code: &str,
    ) -> Result<OrderItem, ApiError> {
        let (owner, status): (Uuid, PaymentStatus) =
            sqlx::query_as("SELECT seller_id, payment_status FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&self.db_pool)
                .await?
                .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        if owner != seller.user_id {
            return Err(ApiError::Forbidden(
                "Only the seller can confirm a collection".to_string(),
            ));
        }
        if status != PaymentStatus::Paid {
            return Err(ApiError::Conflict("Order has not been paid".to_string()));
        }

        let code = normalize_collection_code(collection_code);

        let collected = sqlx::query_as::<_, OrderItem>(
            r#"
            UPDATE order_items
            SET status = 'collected', collected_at = NOW()
            WHERE order_id = $1 AND collection_code = $2 AND status = 'ready_for_collection'
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(&code)
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(item) = collected {
            tracing::info!(order_id = %order_id, order_item_id = %item.id, "Item collected");
            return Ok(item);
        }

        let already: Option<OrderItemStatus> = sqlx::query_scalar(
            "SELECT status FROM order_items WHERE order_id = $1 AND collection_code = $2",
        )
        .bind(order_id)
        .bind(&code)
        .fetch_optional(&self.db_pool)
        .await?;

        match already {
            Some(OrderItemStatus::Collected) => {
                Err(ApiError::Conflict("Item has already been collected".to_string()))
            }
            _ => Err(ApiError::NotFound("Invalid collection code".to_string())),
        }
    }

    pub async fn find_order(&self, order_id: Uuid) -> Result<Order, ApiError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
    }

    pub async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Order, ApiError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_intent_id = $1")
            .bind(payment_intent_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
    }

    /// Remember the provider checkout for a still-pending order
    pub async fn attach_payment_intent(
        &self,
        order_id: Uuid,
        payment_intent_id: &str,
    ) -> Result<(), ApiError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders SET payment_intent_id = $2, updated_at = NOW()
            WHERE id = $1 AND payment_status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(payment_intent_id)
        .execute(&self.db_pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::Conflict("Order is no longer pending".to_string()));
        }
        Ok(())
    }

    /// Move an order to a terminal status in its own transaction
    pub async fn transition(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Transition, ApiError> {
        let mut tx = self.db_pool.begin().await?;
        let outcome = apply_transition(&mut tx, order_id, status).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Pending orders created before `cutoff`
    pub async fn stale_pending_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, ApiError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE payment_status = 'pending' AND created_at < $1
            ORDER BY created_at
            LIMIT 100
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(orders)
    }
}

/// Codes are shown to the buyer once they can be redeemed, never to the seller
fn code_visible(is_buyer: bool, status: OrderItemStatus) -> bool {
    is_buyer
        && matches!(
            status,
            OrderItemStatus::ReadyForCollection | OrderItemStatus::Collected
        )
}

/// Apply a payment status change inside `tx`.
///
/// Only a pending order advances; the conditional UPDATE is what enforces
/// that, so concurrent callers cannot both win. Repeating the current
/// terminal status is a no-op.
async fn apply_transition(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    next: PaymentStatus,
) -> Result<Transition, ApiError> {
    PaymentStatus::Pending.transition_to(next)?;

    let advanced: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE orders SET payment_status = $2, updated_at = NOW()
        WHERE id = $1 AND payment_status = 'pending'
        RETURNING buyer_id
        "#,
    )
    .bind(order_id)
    .bind(next)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(buyer_id) = advanced else {
        let current: PaymentStatus =
            sqlx::query_scalar("SELECT payment_status FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        return match current.transition_to(next)? {
            Transition::Unchanged => Ok(Transition::Unchanged),
            Transition::Advance => Err(ApiError::Conflict(
                "Order status changed concurrently".to_string(),
            )),
        };
    };

    sqlx::query("UPDATE order_items SET status = $2 WHERE order_id = $1 AND status = 'pending'")
        .bind(order_id)
        .bind(next.item_status())
        .execute(&mut **tx)
        .await?;

    if next == PaymentStatus::Paid {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(buyer_id)
            .execute(&mut **tx)
            .await?;
    }

    tracing::info!(order_id = %order_id, status = next.as_str(), "Order status advanced");

    Ok(Transition::Advance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_visibility() {
        assert!(code_visible(true, OrderItemStatus::ReadyForCollection));
        assert!(code_visible(true, OrderItemStatus::Collected));
        assert!(!code_visible(true, OrderItemStatus::Pending));
        assert!(!code_visible(true, OrderItemStatus::Cancelled));
        assert!(!code_visible(false, OrderItemStatus::ReadyForCollection));
    }
}
