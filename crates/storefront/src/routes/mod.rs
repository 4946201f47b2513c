//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store ping)
//!
//! # Cart (session-backed)
//! GET    /api/cart                        - Cart with totals
//! DELETE /api/cart                        - Clear cart and discount
//! POST   /api/cart/items                  - Add one unit of a product
//! PATCH  /api/cart/items/{product_id}     - Set quantity (<= 0 removes)
//! DELETE /api/cart/items/{product_id}     - Remove product
//! POST   /api/cart/discount               - Apply discount code
//! DELETE /api/cart/discount               - Remove discount code
//! POST   /api/cart/checkout               - Start checkout from the session cart
//!
//! # Checkout (CORS, rate limited)
//! POST   /api/checkout/session            - Create hosted checkout session
//! POST   /api/checkout/verify             - Confirm session and create order
//!
//! # Discounts and orders
//! GET    /api/discount-settings           - Card-payment discount
//! PUT    /api/admin/discount-settings     - Update it (bearer token)
//! GET    /api/orders/{id}                 - Order with items (confirming session or admin)
//! ```

pub mod cart;
pub mod checkout;
pub mod discounts;
pub mod health;
pub mod orders;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    http::{HeaderMap, header::ORIGIN},
    middleware::from_fn,
    routing::{get, patch, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::error::AppError;
use crate::middleware::{
    api_rate_limiter, checkout_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// JSON body extractor that rejects with the `{ "error" }` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor that rejects with the `{ "error" }` shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Cart routes, nested under `/api/cart`.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route(
            "/discount",
            post(cart::apply_discount).delete(cart::remove_discount),
        )
        .route("/checkout", post(cart::checkout))
}

/// Checkout routes, nested under `/api/checkout`.
///
/// Called cross-origin by the storefront front-end, so they answer CORS
/// preflight permissively.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(checkout::create_session))
        .route("/verify", post(checkout::verify))
        .layer(CorsLayer::permissive())
}

/// Create all API routes for the storefront.
///
/// Rate limiting is keyed on the client IP, which needs proxy headers or
/// connection info; pass `rate_limit = false` where neither exists (tests).
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut checkout = checkout_routes();
    let mut api = Router::new()
        .nest("/cart", cart_routes())
        .route("/discount-settings", get(discounts::show))
        .route("/admin/discount-settings", put(discounts::update))
        .route("/orders/{id}", get(orders::show));

    if rate_limit {
        checkout = checkout.layer(checkout_rate_limiter());
        api = api.layer(api_rate_limiter());
    }

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/checkout", checkout)
        .nest("/api", api)
}

/// Assemble the storefront application with its middleware stack.
///
/// Sentry layers are added by the binary, outside this router.
pub fn app<S>(state: AppState, session_store: S, rate_limit: bool) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config().is_secure());

    routes(rate_limit)
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The storefront origin to send the customer back to.
///
/// Uses the request's `Origin` header when it is an http(s) origin, else the
/// configured base URL.
pub(crate) fn redirect_origin(headers: &HeaderMap, base_url: &str) -> String {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| url::Url::parse(raw).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map_or_else(
            || base_url.trim_end_matches('/').to_owned(),
            |url| url.origin().ascii_serialization(),
        )
}

#[cfg(test)]
pub(crate) mod testing {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, Response, header},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore as SessionMemoryStore;

    use crate::state::AppState;
    use crate::test_support::{FakeGateway, MemoryStore, test_config};

    /// Router plus handles on its fakes.
    pub struct TestApp {
        pub router: Router,
        pub gateway: Arc<FakeGateway>,
        pub store: Arc<MemoryStore>,
        cookie: Option<String>,
    }

    impl TestApp {
        pub fn new() -> Self {
            let gateway = Arc::new(FakeGateway::default());
            let store = Arc::new(MemoryStore::default());
            let state = AppState::new(test_config(), gateway.clone(), store.clone(), store.clone());
            let router = super::app(state, SessionMemoryStore::default(), false);
            Self {
                router,
                gateway,
                store,
                cookie: None,
            }
        }

        /// Another browser against the same app: shared fakes, no session cookie.
        pub fn other_visitor(&self) -> Self {
            Self {
                router: self.router.clone(),
                gateway: self.gateway.clone(),
                store: self.store.clone(),
                cookie: None,
            }
        }

        /// Send a request, carrying the session cookie like a browser would.
        pub async fn send(&mut self, request: Request<Body>) -> Response<Body> {
            let mut request = request;
            if let Some(cookie) = &self.cookie {
                request
                    .headers_mut()
                    .insert(header::COOKIE, cookie.parse().unwrap());
            }
            let response = self.router.clone().oneshot(request).await.unwrap();
            if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
                let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
                self.cookie = Some(pair.to_owned());
            }
            response
        }

        pub async fn json(
            &mut self,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> (u16, Value) {
            self.json_with(method, uri, body, &[]).await
        }

        /// Like [`TestApp::json`], with extra request headers.
        pub async fn json_with(
            &mut self,
            method: &str,
            uri: &str,
            body: Option<Value>,
            headers: &[(&str, &str)],
        ) -> (u16, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let response = self.send(request).await;
            let status = response.status().as_u16();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_redirect_origin_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://shop.example"));
        assert_eq!(
            redirect_origin(&headers, "http://localhost:3000/"),
            "https://shop.example"
        );
    }

    #[test]
    fn test_redirect_origin_falls_back() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            redirect_origin(&headers, "http://localhost:3000/"),
            "http://localhost:3000"
        );
        headers.insert(ORIGIN, HeaderValue::from_static("null"));
        assert_eq!(
            redirect_origin(&headers, "http://localhost:3000"),
            "http://localhost:3000"
        );
    }
}
