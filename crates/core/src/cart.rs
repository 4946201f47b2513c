//! Cart state holder.
//!
//! [`Cart`] is the pure state: items, an optional applied discount, and the
//! reductions over them. [`PersistentCart`] pairs a cart with a
//! [`CartStorage`] and writes the affected key back after every mutation, so
//! callers never forget to persist.
//!
//! Items and the applied discount are persisted under separate keys. Clearing
//! the cart writes both.

use std::future::Future;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::discount::{AppliedDiscount, DiscountSettings};
use crate::draft::{DRAFT_VERSION, OrderDraft, OrderDraftItem};
use crate::types::{CustomerContact, PaymentMethod, ProductId};

/// Storage key for cart items.
pub const ITEMS_KEY: &str = "cart_items";

/// Storage key for the applied discount.
pub const DISCOUNT_KEY: &str = "applied_discount";

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    pub image: Option<String>,
    /// Always at least 1 while the item is in the cart.
    pub quantity: u32,
}

impl CartItem {
    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// In-memory cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    discount: Option<AppliedDiscount>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from persisted parts.
    #[must_use]
    pub fn from_parts(items: Vec<CartItem>, discount: Option<AppliedDiscount>) -> Self {
        let items = items.into_iter().filter(|item| item.quantity > 0).collect();
        Self { items, discount }
    }

    /// Lines currently in the cart, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// The applied discount, if any.
    #[must_use]
    pub const fn discount(&self) -> Option<&AppliedDiscount> {
        self.discount.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of a product.
    ///
    /// If the product is already in the cart its quantity goes up by one;
    /// otherwise the item is appended with quantity 1, whatever quantity the
    /// caller passed.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem { quantity: 1, ..item });
        }
    }

    /// Drop a product from the cart. Unknown ids are ignored.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items.retain(|line| line.product_id != product_id);
    }

    /// Set a product's quantity; zero or less removes it.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = quantity;
        }
    }

    /// Empty the cart and forget the applied discount.
    pub fn clear(&mut self) {
        self.items.clear();
        self.discount = None;
    }

    /// Replace any applied discount.
    pub fn apply_discount(&mut self, discount: AppliedDiscount) {
        self.discount = Some(discount);
    }

    pub fn remove_discount(&mut self) {
        self.discount = None;
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of price x quantity, before discounts.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Amount the applied discount code takes off.
    #[must_use]
    pub fn discount_amount(&self) -> Decimal {
        self.discount
            .as_ref()
            .map_or(Decimal::ZERO, |discount| discount.amount_off(self.total_price()))
    }

    /// Subtotal after the discount code.
    #[must_use]
    pub fn discounted_total(&self) -> Decimal {
        self.total_price() - self.discount_amount()
    }

    /// What the customer will be charged for `method`.
    ///
    /// The card-payment discount stacks on top of any discount code.
    #[must_use]
    pub fn checkout_total(&self, method: PaymentMethod, settings: &DiscountSettings) -> Decimal {
        let total = self.discounted_total();
        match (method, settings.card_discount()) {
            (PaymentMethod::Card, Some(percentage)) => {
                (total - total * percentage / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            }
            _ => total,
        }
    }

    /// Snapshot the cart as an order draft for checkout.
    #[must_use]
    pub fn to_order_draft(
        &self,
        customer: CustomerContact,
        method: PaymentMethod,
        settings: &DiscountSettings,
    ) -> OrderDraft {
        let card_discount_percentage = match method {
            PaymentMethod::Card => settings.card_discount(),
            PaymentMethod::BankTransfer => None,
        };
        OrderDraft {
            version: DRAFT_VERSION,
            customer,
            items: self
                .items
                .iter()
                .map(|line| OrderDraftItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
            total: self.checkout_total(method, settings),
            discount_code_id: self.discount.as_ref().map(|discount| discount.id),
            discount_percentage: self.discount.as_ref().and_then(AppliedDiscount::percentage),
            card_discount_percentage,
        }
    }
}

/// Where a cart lives between requests.
///
/// Items and discount are separate keys so either can be rewritten alone.
pub trait CartStorage {
    type Error;

    /// Load persisted items; `None` if nothing was stored.
    fn load_items(&self) -> impl Future<Output = Result<Option<Vec<CartItem>>, Self::Error>> + Send;

    fn save_items(&self, items: &[CartItem]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Load the persisted discount; `None` if none is applied.
    fn load_discount(
        &self,
    ) -> impl Future<Output = Result<Option<AppliedDiscount>, Self::Error>> + Send;

    /// Persist the discount, or clear it with `None`.
    fn save_discount(
        &self,
        discount: Option<&AppliedDiscount>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A cart that writes itself back to storage after every mutation.
#[derive(Debug)]
pub struct PersistentCart<S> {
    cart: Cart,
    storage: S,
}

impl<S: CartStorage + Sync> PersistentCart<S> {
    /// Load the cart from storage (empty if nothing stored).
    ///
    /// # Errors
    ///
    /// Returns the storage error if either key cannot be read.
    pub async fn load(storage: S) -> Result<Self, S::Error> {
        let items = storage.load_items().await?.unwrap_or_default();
        let discount = storage.load_discount().await?;
        Ok(Self {
            cart: Cart::from_parts(items, discount),
            storage,
        })
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// See [`Cart::add_item`].
    ///
    /// # Errors
    ///
    /// Returns the storage error if the items cannot be written.
    pub async fn add_item(&mut self, item: CartItem) -> Result<(), S::Error> {
        self.cart.add_item(item);
        self.storage.save_items(self.cart.items()).await
    }

    /// See [`Cart::remove_item`].
    ///
    /// # Errors
    ///
    /// Returns the storage error if the items cannot be written.
    pub async fn remove_item(&mut self, product_id: ProductId) -> Result<(), S::Error> {
        self.cart.remove_item(product_id);
        self.storage.save_items(self.cart.items()).await
    }

    /// See [`Cart::update_quantity`].
    ///
    /// # Errors
    ///
    /// Returns the storage error if the items cannot be written.
    pub async fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), S::Error> {
        self.cart.update_quantity(product_id, quantity);
        self.storage.save_items(self.cart.items()).await
    }

    /// See [`Cart::apply_discount`].
    ///
    /// # Errors
    ///
    /// Returns the storage error if the discount cannot be written.
    pub async fn apply_discount(&mut self, discount: AppliedDiscount) -> Result<(), S::Error> {
        self.cart.apply_discount(discount);
        self.storage.save_discount(self.cart.discount()).await
    }

    /// See [`Cart::remove_discount`].
    ///
    /// # Errors
    ///
    /// Returns the storage error if the discount cannot be written.
    pub async fn remove_discount(&mut self) -> Result<(), S::Error> {
        self.cart.remove_discount();
        self.storage.save_discount(None).await
    }

    /// See [`Cart::clear`]. Both keys are rewritten.
    ///
    /// # Errors
    ///
    /// Returns the storage error if either key cannot be written.
    pub async fn clear(&mut self) -> Result<(), S::Error> {
        self.cart.clear();
        self.storage.save_items(&[]).await?;
        self.storage.save_discount(None).await
    }
}
