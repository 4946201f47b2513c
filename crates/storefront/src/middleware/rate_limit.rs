//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Checkout endpoints call the payment provider on every request, so they get
//! their own strict limiter:
//! - `checkout_rate_limiter`: ~20 requests per minute per IP
//! - `api_rate_limiter`: ~100 requests per minute per IP (cart, settings)

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that checks Cloudflare's `CF-Connecting-IP` header first,
/// then falls back to standard proxy headers.
#[derive(Clone, Copy)]
pub struct CloudflareIpKeyExtractor;

/// Proxy headers consulted in order; `x-forwarded-for` may hold a chain.
const CLIENT_IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

impl tower_governor::key_extractor::KeyExtractor for CloudflareIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        CLIENT_IP_HEADERS
            .iter()
            .find_map(|name| {
                headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
            .or_else(|| {
                req.extensions()
                    .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
                    .map(|info| info.0.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<CloudflareIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for checkout endpoints: ~20 requests per minute per IP.
///
/// Configuration: 1 request every 3 seconds (replenish), burst of 10.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(3)` and `burst_size(10)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(3)
        .burst_size(10)
        .finish()
        .expect("rate limiter config with per_second(3) and burst_size(10) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for general API: ~100 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(1)` and `burst_size(50)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn key(headers: &[(&str, &str)]) -> Result<IpAddr, GovernorError> {
        let mut builder = Request::builder().uri("/api/checkout/session");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        CloudflareIpKeyExtractor.extract(&builder.body(()).unwrap())
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let ip = key(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ])
        .unwrap();
        assert_eq!(ip.to_string(), "203.0.113.7");
    }

    #[test]
    fn test_first_forwarded_hop() {
        let ip = key(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1")]).unwrap();
        assert_eq!(ip.to_string(), "198.51.100.4");
    }

    #[test]
    fn test_no_client_ip() {
        assert!(key(&[("x-real-ip", "not-an-ip")]).is_err());
    }
}
