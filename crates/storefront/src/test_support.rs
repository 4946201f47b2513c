//! In-memory fakes for handler and service tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;

use timberline_core::{
    CurrencyCode, DiscountCode, DiscountCodeId, DiscountKind, DiscountSettings, OrderId,
    OrderItemId, OrderStatus,
};

use crate::config::{StorefrontConfig, StripeConfig};
use crate::db::{DiscountStore, OrderStore, RepositoryError};
use crate::models::{NewOrder, Order, OrderCreation, OrderItem, OrderWithItems};
use crate::stripe::{
    CheckoutSession, CreateCheckoutSession, PaymentGateway, PaymentStatus, StripeError,
};

/// Admin token accepted by [`test_config`].
pub const ADMIN_TOKEN: &str = "tl_admin_9fK2xQ7vLm4RzT8wBn3cYp6H";

pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/timberline_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        admin_token: SecretString::from(ADMIN_TOKEN),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            api_base: "http://stripe.invalid".to_owned(),
            currency: CurrencyCode::USD,
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A payment provider that keeps sessions in memory.
///
/// Sessions start unpaid; tests mark them paid with [`FakeGateway::complete`].
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    requests: Mutex<Vec<CreateCheckoutSession>>,
    next_id: AtomicUsize,
    failure: Mutex<Option<(u16, String)>>,
}

impl FakeGateway {
    pub fn last_request(&self) -> Option<CreateCheckoutSession> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Mark a session paid, optionally overriding the charged amount.
    pub fn complete(&self, id: &str, amount_total: Option<i64>) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(id).unwrap();
        session.payment_status = PaymentStatus::Paid;
        if amount_total.is_some() {
            session.amount_total = amount_total;
        }
    }

    pub fn set_status(&self, id: &str, status: PaymentStatus) {
        self.sessions
            .lock()
            .unwrap()
            .get_mut(id)
            .unwrap()
            .payment_status = status;
    }

    pub fn insert_paid_session(&self, id: &str, amount: i64, metadata: BTreeMap<String, String>) {
        self.sessions.lock().unwrap().insert(
            id.to_owned(),
            CheckoutSession {
                id: id.to_owned(),
                url: None,
                payment_status: PaymentStatus::Paid,
                amount_total: Some(amount),
                currency: Some("usd".to_owned()),
                metadata,
            },
        );
    }

    /// Make every following call fail with this provider error.
    pub fn fail_with(&self, status: u16, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_owned()));
    }

    fn check_failure(&self) -> Result<(), StripeError> {
        match self.failure.lock().unwrap().clone() {
            Some((status, message)) => Err(StripeError::Api { status, message }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        self.check_failure()?;
        let id = format!("cs_test_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.stripe.test/c/pay/{id}")),
            payment_status: PaymentStatus::Unpaid,
            amount_total: Some(request.amount),
            currency: Some(request.currency.as_provider_code().to_owned()),
            metadata: request.metadata.clone(),
        };
        self.sessions.lock().unwrap().insert(id, session.clone());
        self.requests.lock().unwrap().push(request.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, StripeError> {
        self.check_failure()?;
        self.sessions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StripeError::Api {
                status: 404,
                message: format!("No such checkout.session: '{id}'"),
            })
    }
}

#[derive(Default)]
struct MemoryInner {
    orders: Vec<OrderWithItems>,
    codes: Vec<DiscountCode>,
    settings: Option<DiscountSettings>,
}

/// Order and discount storage in memory, with the same once-per-session rule.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    /// Add a percentage code and return its id.
    pub fn add_code(
        &self,
        code: &str,
        percentage: Decimal,
        max_uses: Option<i32>,
        current_uses: i32,
    ) -> DiscountCodeId {
        let id = DiscountCodeId::new();
        self.inner.lock().unwrap().codes.push(DiscountCode {
            id,
            code: code.to_owned(),
            kind: DiscountKind::Percentage,
            value: percentage,
            max_uses,
            current_uses,
            active: true,
            expires_at: None,
        });
        id
    }

    pub fn code_uses(&self, id: DiscountCodeId) -> i32 {
        self.inner
            .lock()
            .unwrap()
            .codes
            .iter()
            .find(|code| code.id == id)
            .map_or(0, |code| code.current_uses)
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    /// Make `ping` fail, as if the database were down.
    pub fn set_unreachable(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn create_paid_order(&self, new: NewOrder) -> Result<OrderCreation, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .orders
            .iter()
            .find(|o| o.order.checkout_session_id == new.checkout_session_id)
        {
            return Ok(OrderCreation::Existing(existing.order.id));
        }

        let order_id = OrderId::new();
        let items = new
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();
        inner.orders.push(OrderWithItems {
            order: Order {
                id: order_id,
                checkout_session_id: new.checkout_session_id,
                customer: new.customer,
                total: new.total,
                discount_code_id: new.discount_code_id,
                payment_method: new.payment_method,
                status: OrderStatus::Paid,
                created_at: Utc::now(),
            },
            items,
        });
        if let Some(code_id) = new.discount_code_id
            && let Some(code) = inner.codes.iter_mut().find(|code| code.id == code_id)
        {
            code.current_uses += 1;
        }
        Ok(OrderCreation::Created(order_id))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.order.id == id)
            .cloned())
    }
}

#[async_trait]
impl DiscountStore for MemoryStore {
    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let wanted = code.trim().to_lowercase();
        Ok(self
            .inner
            .lock()
            .unwrap()
            .codes
            .iter()
            .find(|c| c.code.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_code_by_id(
        &self,
        id: DiscountCodeId,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .codes
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn settings(&self) -> Result<Option<DiscountSettings>, RepositoryError> {
        Ok(self.inner.lock().unwrap().settings)
    }

    async fn save_settings(&self, settings: DiscountSettings) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().settings = Some(settings);
        Ok(())
    }
}
