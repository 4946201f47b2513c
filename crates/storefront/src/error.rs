//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Errors are rendered as `{ "error": "<message>" }`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::discounts::DiscountError;
use crate::stripe::StripeError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("{0}")]
    Database(#[from] RepositoryError),

    /// Checkout could not be started or confirmed.
    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    /// Discount settings or code operation failed.
    #[error("{0}")]
    Discount(#[from] DiscountError),

    /// Cart session could not be read or written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authorized.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => checkout_status(err),
            Self::Discount(err) => match err {
                DiscountError::InvalidSettings(_) | DiscountError::Rejected(_) => {
                    StatusCode::BAD_REQUEST
                }
                DiscountError::UnknownCode(_) => StatusCode::NOT_FOUND,
                DiscountError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::InvalidDraft(_)
        | CheckoutError::InvalidAmount(_)
        | CheckoutError::InvalidSessionId
        | CheckoutError::BankTransferUnavailable(_) => StatusCode::BAD_REQUEST,
        CheckoutError::Discount(DiscountError::UnknownCode(_) | DiscountError::Rejected(_)) => {
            StatusCode::BAD_REQUEST
        }
        CheckoutError::Discount(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CheckoutError::Payment(stripe) => provider_status(stripe),
        CheckoutError::NotPaid(_)
        | CheckoutError::MissingSessionUrl
        | CheckoutError::MissingAmount
        | CheckoutError::CorruptSession(_)
        | CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Payment-required and rate-limit statuses pass through; anything else is a 500.
fn provider_status(err: &StripeError) -> StatusCode {
    match err.status() {
        Some(402) => StatusCode::PAYMENT_REQUIRED,
        Some(429) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for checkout actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
