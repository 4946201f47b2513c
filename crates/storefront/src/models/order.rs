//! Order domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use timberline_core::{
    CustomerContact, DiscountCodeId, OrderDraftItem, OrderId, OrderItemId, OrderStatus,
    PaymentMethod, ProductId,
};

/// A paid order (domain type).
///
/// Written exactly once per confirmed checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Checkout session the order was materialized from.
    pub checkout_session_id: String,
    /// Who placed the order.
    pub customer: CustomerContact,
    /// Amount the payment provider confirmed.
    pub total: Decimal,
    /// Discount code redeemed on this order, if any.
    pub discount_code_id: Option<DiscountCodeId>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One purchased line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Everything needed to persist a confirmed order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub checkout_session_id: String,
    pub customer: CustomerContact,
    pub total: Decimal,
    pub discount_code_id: Option<DiscountCodeId>,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderDraftItem>,
}

/// Outcome of persisting a confirmed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCreation {
    /// A new order row was written (and any discount use counted).
    Created(OrderId),
    /// The session was already materialized; nothing was written.
    Existing(OrderId),
}

impl OrderCreation {
    /// The order ID, whether new or pre-existing.
    #[must_use]
    pub const fn order_id(self) -> OrderId {
        match self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }

    /// Whether this call wrote the order.
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::Created(_))
    }
}
