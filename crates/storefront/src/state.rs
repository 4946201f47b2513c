//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{DiscountStore, OrderStore};
use crate::services::checkout::CheckoutService;
use crate::services::discounts::DiscountService;
use crate::stripe::PaymentGateway;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the payment gateway, the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
    discounts: DiscountService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `gateway` - Hosted checkout provider
    /// * `orders` - Order persistence
    /// * `discounts` - Discount code and settings persistence
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
        discounts: Arc<dyn DiscountStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                orders,
                discounts: DiscountService::new(discounts),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Get a reference to the discount service.
    #[must_use]
    pub fn discounts(&self) -> &DiscountService {
        &self.inner.discounts
    }

    /// Checkout orchestration bound to this state's gateway and stores.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            self.inner.gateway.as_ref(),
            self.inner.orders.as_ref(),
            &self.inner.discounts,
            self.inner.config.stripe.currency,
        )
    }
}
