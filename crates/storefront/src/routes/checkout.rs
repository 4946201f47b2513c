//! Hosted checkout route handlers.
//!
//! `session` hands the order draft to the payment provider and returns the
//! hosted page URL. `verify` is called from the success page once the
//! provider redirects back; it is the only path that writes orders.

use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use timberline_core::{OrderDraft, OrderId, PaymentMethod};

use crate::error::{Result, add_breadcrumb};
use crate::routes::{ApiJson, redirect_origin};
use crate::services::{cart, orders};
use crate::services::checkout::CheckoutStarted;
use crate::state::AppState;

/// Create-session request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub order_data: OrderDraft,
    pub payment_method: PaymentMethod,
}

/// Where to send the customer to pay.
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub url: String,
    pub session_id: String,
}

impl From<CheckoutStarted> for SessionCreated {
    fn from(started: CheckoutStarted) -> Self {
        Self {
            url: started.url,
            session_id: started.session_id,
        }
    }
}

/// Verify request body.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub session_id: String,
}

/// Outcome of a confirmed checkout.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    pub discount_applied: bool,
}

/// Create a hosted checkout session for a client-assembled order draft.
#[instrument(skip(state, headers, request), fields(method = %request.payment_method))]
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CreateSessionRequest>,
) -> Result<Json<SessionCreated>> {
    let origin = redirect_origin(&headers, &state.config().base_url);
    let started = state
        .checkout()
        .start_checkout(&request.order_data, request.payment_method, &origin)
        .await?;

    add_breadcrumb(
        "checkout",
        "Checkout session created",
        Some(&[("session_id", started.session_id.as_str())]),
    );
    Ok(Json(started.into()))
}

/// Confirm a paid session, create its order, and empty the visitor's cart.
///
/// The order id is remembered in the session so its details can be shown back.
#[instrument(skip(state, session, request))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let confirmation = state
        .checkout()
        .confirm_checkout(request.session_id.trim())
        .await?;

    // The order exists at this point; session bookkeeping is not worth failing over.
    if let Err(e) = orders::remember(&session, confirmation.order_id).await {
        tracing::warn!(error = %e, "Failed to record confirmed order in session");
    }
    match cart::load(session).await {
        Ok(mut cart) => {
            if let Err(e) = cart.clear().await {
                tracing::warn!(error = %e, "Failed to clear cart after checkout");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to load cart after checkout"),
    }

    Ok(Json(VerifyResponse {
        success: true,
        order_id: confirmation.order_id,
        payment_method: confirmation.payment_method,
        discount_applied: confirmation.discount_applied,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    use timberline_core::{DiscountCodeId, ProductId};

    use crate::routes::testing::TestApp;

    fn order_data(total: &str) -> Value {
        json!({
            "customer": {
                "name": "Ada Birch",
                "email": "ada@example.com",
                "phone": "555-0100",
                "address": "12 Elm Street"
            },
            "items": [
                { "product_id": ProductId::new(), "quantity": 2, "price": "500" },
                { "product_id": ProductId::new(), "quantity": 1, "price": "300" }
            ],
            "total": total
        })
    }

    #[tokio::test]
    async fn test_session_then_verify() {
        let mut app = TestApp::new();
        let (status, body) = app
            .json_with(
                "POST",
                "/api/checkout/session",
                Some(json!({ "orderData": order_data("1300"), "paymentMethod": "card" })),
                &[("origin", "https://shop.example")],
            )
            .await;
        assert_eq!(status, 200);
        let session_id = body["session_id"].as_str().unwrap().to_owned();
        assert!(body["url"].as_str().unwrap().contains(&session_id));

        let request = app.gateway.last_request().unwrap();
        assert_eq!(request.amount, 130_000);
        assert!(request.success_url.starts_with("https://shop.example/checkout/success"));

        app.gateway.complete(&session_id, None);
        let (status, body) = app
            .json(
                "POST",
                "/api/checkout/verify",
                Some(json!({ "session_id": session_id })),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["payment_method"], "card");
        assert_eq!(body["discount_applied"], false);

        let order_id = body["order_id"].as_str().unwrap();
        let (status, order) = app.json("GET", &format!("/api/orders/{order_id}"), None).await;
        assert_eq!(status, 200);
        assert_eq!(
            order["total"].as_str().unwrap().parse::<Decimal>().unwrap(),
            Decimal::from(1300)
        );
        assert_eq!(order["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_verify_unpaid_session_is_error() {
        let mut app = TestApp::new();
        let (_, body) = app
            .json(
                "POST",
                "/api/checkout/session",
                Some(json!({ "orderData": order_data("1300"), "paymentMethod": "bank_transfer" })),
            )
            .await;
        let session_id = body["session_id"].as_str().unwrap().to_owned();

        let (status, body) = app
            .json(
                "POST",
                "/api/checkout/verify",
                Some(json!({ "session_id": session_id })),
            )
            .await;
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().contains("not been completed"));
        assert_eq!(app.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let mut app = TestApp::new();
        app.gateway.fail_with(500, "Something went wrong on the provider's end.");
        let (status, body) = app
            .json(
                "POST",
                "/api/checkout/session",
                Some(json!({ "orderData": order_data("1300"), "paymentMethod": "card" })),
            )
            .await;
        assert_eq!(status, 500);
        assert_eq!(body["error"], "Something went wrong on the provider's end.");
    }

    #[tokio::test]
    async fn test_invalid_order_data_is_bad_request() {
        let mut app = TestApp::new();
        let (status, _) = app
            .json(
                "POST",
                "/api/checkout/session",
                Some(json!({ "orderData": order_data("-5"), "paymentMethod": "card" })),
            )
            .await;
        assert_eq!(status, 400);

        let (status, _) = app
            .json(
                "POST",
                "/api/checkout/session",
                Some(json!({ "orderData": order_data("10"), "paymentMethod": "cash" })),
            )
            .await;
        assert_eq!(status, 400);
        assert!(app.gateway.last_request().is_none());
    }

    #[tokio::test]
    async fn test_unknown_discount_code_id_is_rejected_before_payment() {
        let mut app = TestApp::new();
        let mut data = order_data("1170");
        data["discount_code_id"] = json!(DiscountCodeId::new());
        data["discount_percentage"] = json!("10");

        let (status, body) = app
            .json(
                "POST",
                "/api/checkout/session",
                Some(json!({ "orderData": data, "paymentMethod": "card" })),
            )
            .await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("not found"));
        assert!(app.gateway.last_request().is_none());
    }

    #[tokio::test]
    async fn test_verify_clears_session_cart() {
        let mut app = TestApp::new();
        app.json(
            "POST",
            "/api/cart/items",
            Some(json!({ "product_id": ProductId::new(), "name": "Oak bench", "price": 420 })),
        )
        .await;
        let (_, body) = app
            .json(
                "POST",
                "/api/cart/checkout",
                Some(json!({ "customer": order_data("0")["customer"], "paymentMethod": "card" })),
            )
            .await;
        let session_id = body["session_id"].as_str().unwrap().to_owned();
        app.gateway.complete(&session_id, None);

        let (status, _) = app
            .json(
                "POST",
                "/api/checkout/verify",
                Some(json!({ "session_id": session_id })),
            )
            .await;
        assert_eq!(status, 200);

        let (_, cart) = app.json("GET", "/api/cart", None).await;
        assert_eq!(cart["total_items"], 0);
    }
}
