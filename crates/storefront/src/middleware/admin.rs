//! Back-office authorization.
//!
//! Settings endpoints are called by back-office tooling with a static bearer
//! token from configuration. The same token lets the back office read any
//! order.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that requires the admin bearer token.
///
/// ```rust,ignore
/// async fn update_settings(_admin: RequireAdmin, ...) -> Result<...> { ... }
/// ```
pub struct RequireAdmin;

impl RequireAdmin {
    /// Check `headers` for the admin bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if the token is missing or wrong.
    pub fn check(headers: &HeaderMap, state: &AppState) -> Result<Self, AppError> {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

        if !constant_time_eq(
            presented.trim().as_bytes(),
            state.config().admin_token.expose_secret().as_bytes(),
        ) {
            tracing::warn!("Rejected admin request with invalid token");
            return Err(AppError::Unauthorized("invalid token".to_owned()));
        }

        Ok(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::check(&parts.headers, state)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
