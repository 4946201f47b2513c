//! Checkout: hosted payment session creation and confirmation.
//!
//! Two stateless steps joined by the provider's session:
//!
//! 1. [`CheckoutService::start_checkout`] turns an order draft into a hosted
//!    checkout session. The draft rides along in the session metadata.
//! 2. [`CheckoutService::confirm_checkout`] retrieves the session, refuses
//!    anything not paid, and materializes the order from the metadata and the
//!    provider-confirmed amount.
//!
//! Confirmation is idempotent on the session id: repeated calls return the
//! order the first call created.

use thiserror::Error;
use tracing::instrument;

use timberline_core::{
    CurrencyCode, DraftError, Money, MoneyError, OrderDraft, OrderId, PaymentMethod,
};

use crate::db::{OrderStore, RepositoryError};
use crate::models::NewOrder;
use crate::services::discounts::{DiscountError, DiscountService};
use crate::stripe::{CreateCheckoutSession, PaymentGateway, StripeError, bank_transfer_type};

/// Metadata keys written next to the chunked draft.
pub mod metadata_keys {
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const DISCOUNT_CODE_ID: &str = "discount_code_id";
    pub const DISCOUNT_PERCENTAGE: &str = "discount_percentage";
    pub const DISCOUNT_APPLIED: &str = "discount_applied";
}

/// Errors from starting or confirming a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    InvalidDraft(DraftError),
    #[error("{0}")]
    InvalidAmount(#[from] MoneyError),
    #[error("invalid checkout session id")]
    InvalidSessionId,
    #[error("bank transfer is not available for {0}")]
    BankTransferUnavailable(CurrencyCode),
    #[error("{0}")]
    Discount(#[from] DiscountError),
    #[error("{0}")]
    Payment(#[from] StripeError),
    #[error("payment has not been completed for session {0}")]
    NotPaid(String),
    #[error("payment provider did not return a checkout URL")]
    MissingSessionUrl,
    #[error("payment provider did not report the amount charged")]
    MissingAmount,
    #[error("checkout session metadata is invalid: {0}")]
    CorruptSession(String),
    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

impl From<DraftError> for CheckoutError {
    fn from(err: DraftError) -> Self {
        Self::CorruptSession(err.to_string())
    }
}

/// A created hosted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStarted {
    pub url: String,
    pub session_id: String,
}

/// Result of confirming a paid session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfirmation {
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    pub discount_applied: bool,
    /// `false` when this session had already been confirmed.
    pub newly_created: bool,
}

/// Checkout orchestration over a payment gateway, an order store and the
/// discount codes drafts may reference.
pub struct CheckoutService<'a> {
    gateway: &'a dyn PaymentGateway,
    orders: &'a dyn OrderStore,
    discounts: &'a DiscountService,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        gateway: &'a dyn PaymentGateway,
        orders: &'a dyn OrderStore,
        discounts: &'a DiscountService,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            gateway,
            orders,
            discounts,
            currency,
        }
    }

    /// Create a hosted checkout session for `draft`.
    ///
    /// The total is charged as given; it is reconciled against the provider's
    /// confirmed amount at confirmation time. `origin` is the storefront URL
    /// the provider redirects back to.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidDraft` or `InvalidAmount` for bad
    /// input, `CheckoutError::Discount` if the draft's discount code is
    /// unknown or no longer redeemable, and `CheckoutError::Payment` if the
    /// provider call fails.
    #[instrument(skip(self, draft), fields(items = draft.items.len(), method = %method))]
    pub async fn start_checkout(
        &self,
        draft: &OrderDraft,
        method: PaymentMethod,
        origin: &str,
    ) -> Result<CheckoutStarted, CheckoutError> {
        draft.validate().map_err(CheckoutError::InvalidDraft)?;
        if method == PaymentMethod::BankTransfer && bank_transfer_type(self.currency).is_none() {
            return Err(CheckoutError::BankTransferUnavailable(self.currency));
        }
        // The code id ends up as a foreign key on the order; it must resolve now, not after payment.
        if let Some(id) = draft.discount_code_id {
            self.discounts.redeem_id(id).await?;
        }

        let amount = Money::new(draft.total, self.currency)?.to_minor_units()?;

        let mut metadata = draft.to_metadata().map_err(CheckoutError::InvalidDraft)?;
        metadata.insert(metadata_keys::PAYMENT_METHOD.to_owned(), method.to_string());
        if let Some(id) = draft.discount_code_id {
            metadata.insert(metadata_keys::DISCOUNT_CODE_ID.to_owned(), id.to_string());
        }
        if let Some(percentage) = draft.discount_percentage {
            metadata.insert(
                metadata_keys::DISCOUNT_PERCENTAGE.to_owned(),
                percentage.to_string(),
            );
        }
        metadata.insert(
            metadata_keys::DISCOUNT_APPLIED.to_owned(),
            draft.discount_applied().to_string(),
        );

        let origin = origin.trim_end_matches('/');
        let request = CreateCheckoutSession {
            amount,
            currency: self.currency,
            description: format!("Order ({} items)", draft.item_count()),
            customer_email: draft.customer.email.to_string(),
            payment_method: method,
            success_url: format!("{origin}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/checkout/cancel"),
            metadata,
        };

        let session = self.gateway.create_checkout_session(&request).await?;
        let url = session.url.ok_or(CheckoutError::MissingSessionUrl)?;

        Ok(CheckoutStarted {
            url,
            session_id: session.id,
        })
    }

    /// Confirm a session is paid and persist its order, once.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotPaid` without writing anything if the
    /// provider does not report the session as paid. Provider, metadata and
    /// repository failures are returned as their own variants.
    #[instrument(skip(self))]
    pub async fn confirm_checkout(
        &self,
        session_id: &str,
    ) -> Result<CheckoutConfirmation, CheckoutError> {
        if !is_valid_session_id(session_id) {
            return Err(CheckoutError::InvalidSessionId);
        }

        let session = self.gateway.retrieve_checkout_session(session_id).await?;
        if !session.is_paid() {
            tracing::warn!(session_id, status = ?session.payment_status, "Refusing to confirm unpaid session");
            return Err(CheckoutError::NotPaid(session.id));
        }

        let draft = OrderDraft::from_metadata(&session.metadata)?;
        let payment_method = session
            .metadata
            .get(metadata_keys::PAYMENT_METHOD)
            .ok_or_else(|| {
                CheckoutError::CorruptSession(format!(
                    "missing {}",
                    metadata_keys::PAYMENT_METHOD
                ))
            })?
            .parse::<PaymentMethod>()
            .map_err(CheckoutError::CorruptSession)?;

        let minor = session.amount_total.ok_or(CheckoutError::MissingAmount)?;
        let charged_in = session.currency.as_deref().unwrap_or_default();
        if !charged_in.eq_ignore_ascii_case(self.currency.as_provider_code()) {
            return Err(CheckoutError::CorruptSession(format!(
                "charged in {charged_in:?}, store currency is {}",
                self.currency
            )));
        }
        let total = Money::from_minor_units(minor, self.currency)?;

        let discount_applied = draft.discount_applied();
        let creation = self
            .orders
            .create_paid_order(NewOrder {
                checkout_session_id: session.id,
                customer: draft.customer,
                total: total.amount(),
                discount_code_id: draft.discount_code_id,
                payment_method,
                items: draft.items,
            })
            .await?;

        if creation.is_new() {
            tracing::info!(order_id = %creation.order_id(), total = %total.amount(), "Order created");
        } else {
            tracing::info!(order_id = %creation.order_id(), "Session already confirmed");
        }

        Ok(CheckoutConfirmation {
            order_id: creation.order_id(),
            payment_method,
            discount_applied,
            newly_created: creation.is_new(),
        })
    }
}

/// Provider session ids are `cs_` style tokens; anything else never reaches the API path.
fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 255 && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
