//! Stripe Checkout API client.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the REST API (form-encoded requests, JSON responses)
//! - Only the two calls checkout needs: create a session, retrieve a session
//! - No retries; a failed call surfaces to the caller
//!
//! Handlers depend on the [`PaymentGateway`] trait rather than the client so
//! the checkout flow can run against a fake provider in tests.

mod client;
pub mod types;

pub use client::StripeClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl StripeError {
    /// HTTP status Stripe reported, if the error came from the API.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A hosted checkout provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError>;

    /// Retrieve a session by id, including its metadata.
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, StripeError>;
}
