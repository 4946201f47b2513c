//! Request and response shapes for Stripe Checkout.

use std::collections::BTreeMap;

use serde::Deserialize;

use timberline_core::{CurrencyCode, PaymentMethod};

/// Parameters for a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSession {
    /// Charge in minor units (cents).
    pub amount: i64,
    pub currency: CurrencyCode,
    /// Name of the single aggregated line item.
    pub description: String,
    pub customer_email: String,
    pub payment_method: PaymentMethod,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque key/value pairs returned unchanged on retrieval.
    pub metadata: BTreeMap<String, String>,
}

impl CreateCheckoutSession {
    /// Encode as Stripe's bracketed form parameters.
    ///
    /// Bank transfers go through `customer_balance`, which needs a customer
    /// object and a bank transfer type matching the currency.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
            ("customer_email".into(), self.customer_email.clone()),
            (
                "line_items[0][price_data][currency]".into(),
                self.currency.as_provider_code().into(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                self.amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                self.description.clone(),
            ),
            ("line_items[0][quantity]".into(), "1".into()),
        ];

        match self.payment_method {
            PaymentMethod::Card => {
                form.push(("payment_method_types[0]".into(), "card".into()));
            }
            PaymentMethod::BankTransfer => {
                form.push(("payment_method_types[0]".into(), "customer_balance".into()));
                form.push(("customer_creation".into(), "always".into()));
                form.push((
                    "payment_method_options[customer_balance][funding_type]".into(),
                    "bank_transfer".into(),
                ));
                if let Some(kind) = bank_transfer_type(self.currency) {
                    form.push((
                        "payment_method_options[customer_balance][bank_transfer][type]".into(),
                        kind.into(),
                    ));
                }
            }
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        form
    }
}

/// Stripe's bank transfer type for a currency, if bank transfers are offered in it.
#[must_use]
pub const fn bank_transfer_type(currency: CurrencyCode) -> Option<&'static str> {
    match currency {
        CurrencyCode::USD => Some("us_bank_transfer"),
        CurrencyCode::GBP => Some("gb_bank_transfer"),
        CurrencyCode::EUR | CurrencyCode::CAD | CurrencyCode::AUD => None,
    }
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

/// A checkout session as returned by create and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page URL; absent once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
    /// Confirmed charge in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSession {
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Error envelope returned by the Stripe API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}
