//! Order repository for database operations.
//!
//! Queries are checked at runtime (`query_as` into `FromRow` rows) and mapped
//! into domain types, failing with `DataCorruption` on values the domain
//! rejects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use timberline_core::{
    CustomerContact, DiscountCodeId, Email, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    ProductId,
};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderCreation, OrderItem, OrderWithItems};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    checkout_session_id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    customer_address: String,
    total: Decimal,
    discount_code_id: Option<Uuid>,
    payment_method: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let payment_method = row
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: OrderId::from_uuid(row.id),
            checkout_session_id: row.checkout_session_id,
            customer: CustomerContact {
                name: row.customer_name,
                email,
                phone: row.customer_phone,
                address: row.customer_address,
            },
            total: row.total,
            discount_code_id: row.discount_code_id.map(DiscountCodeId::from_uuid),
            payment_method,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "invalid quantity {} on order item {}",
                row.quantity, row.id
            ))
        })?;
        Ok(Self {
            id: OrderItemId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity,
            price: row.price,
        })
    }
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a paid order, its items and the discount use in one transaction.
    ///
    /// The unique `checkout_session_id` makes this idempotent: a second call
    /// for the same session writes nothing and returns the existing order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction is rolled back and nothing is written.
    pub async fn create_paid(&self, order: &NewOrder) -> Result<OrderCreation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r"
            INSERT INTO orders (
                checkout_session_id, customer_name, customer_email, customer_phone,
                customer_address, total, discount_code_id, payment_method, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'paid')
            ON CONFLICT (checkout_session_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&order.checkout_session_id)
        .bind(&order.customer.name)
        .bind(order.customer.email.as_str())
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(order.total)
        .bind(order.discount_code_id.map(|id| id.as_uuid()))
        .bind(order.payment_method.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_id) = inserted else {
            // Lost the race (or a retry): another request already wrote it.
            let existing: Uuid =
                sqlx::query_scalar("SELECT id FROM orders WHERE checkout_session_id = $1")
                    .bind(&order.checkout_session_id)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.commit().await?;
            return Ok(OrderCreation::Existing(OrderId::from_uuid(existing)));
        };

        let product_ids: Vec<Uuid> = order.items.iter().map(|i| i.product_id.as_uuid()).collect();
        let quantities = order
            .items
            .iter()
            .map(|i| {
                i32::try_from(i.quantity).map_err(|_| {
                    RepositoryError::DataCorruption(format!(
                        "quantity {} for product {} out of range",
                        i.quantity, i.product_id
                    ))
                })
            })
            .collect::<Result<Vec<i32>, _>>()?;
        let prices: Vec<Decimal> = order.items.iter().map(|i| i.price).collect();

        sqlx::query(
            r"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            SELECT $1, product_id, quantity, price
            FROM UNNEST($2::uuid[], $3::int4[], $4::numeric[]) AS t(product_id, quantity, price)
            ",
        )
        .bind(order_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&prices)
        .execute(&mut *tx)
        .await?;

        if let Some(code_id) = order.discount_code_id {
            sqlx::query("UPDATE discount_codes SET current_uses = current_uses + 1 WHERE id = $1")
                .bind(code_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(OrderCreation::Created(OrderId::from_uuid(order_id)))
    }

    /// Get an order and its items by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get_with_items(
        &self,
        id: OrderId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, checkout_session_id, customer_name, customer_email, customer_phone,
                   customer_address, total, discount_code_id, payment_method, status, created_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, quantity, price
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_id
            ",
        )
        .bind(id.as_uuid())
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(OrderWithItems { order, items }))
    }

    /// Most recent orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, checkout_session_id, customer_name, customer_email, customer_phone,
                   customer_address, total, discount_code_id, payment_method, status, created_at
            FROM orders
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect()
    }

    /// Move an order to a new lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
