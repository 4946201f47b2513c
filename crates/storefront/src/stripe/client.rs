//! Stripe REST client implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::types::{CheckoutSession, CreateCheckoutSession, ErrorEnvelope};
use super::{PaymentGateway, StripeError};
use crate::config::StripeConfig;

/// Pinned Stripe API version.
const API_VERSION: &str = "2024-06-20";

/// Client for the Stripe Checkout API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.secret_key.expose_secret()))
                .map_err(|e| StripeError::Parse(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
            }),
        })
    }

    /// Send a request and decode the JSON body, mapping Stripe error envelopes.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StripeError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| {
                    tracing::debug!(kind = ?envelope.error.kind, "Stripe error envelope");
                    envelope.error.message
                })
                .unwrap_or_else(|| format!("Stripe returned HTTP {status}"));
            tracing::warn!(status = %status, message = %message, "Stripe API returned non-success status");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Stripe response"
            );
            StripeError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(amount = request.amount, method = %request.payment_method))]
    async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        let url = format!("{}/v1/checkout/sessions", self.inner.api_base);
        let session: CheckoutSession = self
            .send(self.inner.client.post(&url).form(&request.to_form()))
            .await?;
        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, StripeError> {
        let url = format!("{}/v1/checkout/sessions/{id}", self.inner.api_base);
        self.send(self.inner.client.get(&url)).await
    }
}
