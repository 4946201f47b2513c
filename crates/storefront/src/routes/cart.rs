//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Every mutation returns the
//! updated [`CartView`] so the front-end can redraw without a second request.

use axum::{Json, extract::State, http::HeaderMap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use timberline_core::{
    AppliedDiscount, Cart, CartItem, CustomerContact, DiscountSettings, PaymentMethod, ProductId,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::routes::checkout::SessionCreated;
use crate::routes::{ApiJson, ApiPath, redirect_origin};
use crate::services::cart;
use crate::state::AppState;

/// Cart contents and totals for display.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub discount: Option<AppliedDiscount>,
    pub total_items: u64,
    pub total_price: Decimal,
    pub discount_amount: Decimal,
    pub discounted_total: Decimal,
    /// Extra card-payment discount currently on offer, if any.
    pub card_discount_percentage: Option<Decimal>,
    /// What paying by card would cost.
    pub card_total: Decimal,
}

impl CartView {
    fn new(cart: &Cart, settings: &DiscountSettings) -> Self {
        Self {
            items: cart.items().to_vec(),
            discount: cart.discount().cloned(),
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            discount_amount: cart.discount_amount(),
            discounted_total: cart.discounted_total(),
            card_discount_percentage: settings.card_discount(),
            card_total: cart.checkout_total(PaymentMethod::Card, settings),
        }
    }
}

async fn view(state: &AppState, cart: &Cart) -> Result<Json<CartView>> {
    let settings = state.discounts().current().await?;
    Ok(Json(CartView::new(cart, &settings)))
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

/// Quantity update data.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Discount code entry.
#[derive(Debug, Deserialize)]
pub struct ApplyDiscountRequest {
    pub code: String,
}

/// Checkout from the session cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCheckoutRequest {
    pub customer: CustomerContact,
    pub payment_method: PaymentMethod,
}

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = cart::load(session).await?;
    view(&state, cart.cart()).await
}

/// Empty the cart and drop any applied discount.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = cart::load(session).await?;
    cart.clear().await?;
    view(&state, cart.cart()).await
}

/// Add one unit of a product.
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> Result<Json<CartView>> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }
    if request.price.is_sign_negative() {
        return Err(AppError::BadRequest("price cannot be negative".to_owned()));
    }

    let mut cart = cart::load(session).await?;
    cart.add_item(CartItem {
        product_id: request.product_id,
        name: request.name.trim().to_owned(),
        price: request.price,
        image: request.image,
        quantity: 1,
    })
    .await?;

    let product_id = request.product_id.to_string();
    add_breadcrumb("cart", "Item added", Some(&[("product_id", product_id.as_str())]));
    view(&state, cart.cart()).await
}

/// Set a line's quantity. Zero or less removes it.
#[instrument(skip(state, session))]
pub async fn update_item(
    State(state): State<AppState>,
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let mut cart = cart::load(session).await?;
    cart.update_quantity(product_id, request.quantity).await?;
    view(&state, cart.cart()).await
}

/// Remove a product from the cart.
#[instrument(skip(state, session))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = cart::load(session).await?;
    cart.remove_item(product_id).await?;
    view(&state, cart.cart()).await
}

/// Apply a discount code, replacing any already applied.
#[instrument(skip(state, session, request))]
pub async fn apply_discount(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<ApplyDiscountRequest>,
) -> Result<Json<CartView>> {
    let discount = state.discounts().redeem(&request.code).await?;
    let mut cart = cart::load(session).await?;
    cart.apply_discount(discount).await?;
    view(&state, cart.cart()).await
}

/// Drop the applied discount code.
#[instrument(skip(state, session))]
pub async fn remove_discount(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = cart::load(session).await?;
    cart.remove_discount().await?;
    view(&state, cart.cart()).await
}

/// Start a hosted checkout for the session cart.
///
/// Builds the order draft server-side, so the charged total reflects the
/// cart's own discount and card-payment settings.
#[instrument(skip(state, session, headers, request), fields(method = %request.payment_method))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CartCheckoutRequest>,
) -> Result<Json<SessionCreated>> {
    let cart = cart::load(session).await?;
    if cart.cart().is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_owned()));
    }

    let settings = state.discounts().current().await?;
    let draft = cart
        .cart()
        .to_order_draft(request.customer, request.payment_method, &settings);
    let origin = redirect_origin(&headers, &state.config().base_url);

    let started = state
        .checkout()
        .start_checkout(&draft, request.payment_method, &origin)
        .await?;

    Ok(Json(started.into()))
}
