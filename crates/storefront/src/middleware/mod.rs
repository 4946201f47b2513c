//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, carts)
//! 5. Security headers
//! 6. Rate limiting (governor, per route group)
//! 7. CORS (checkout routes only)

pub mod admin;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use admin::RequireAdmin;
pub use rate_limit::{RateLimiterLayer, api_rate_limiter, checkout_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
