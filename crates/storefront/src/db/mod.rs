//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `timberline_storefront`
//!
//! ## Tables
//!
//! - `orders` - One row per confirmed checkout session
//! - `order_items` - Purchased lines of each order
//! - `discount_codes` - Codes redeemable in the cart
//! - `discount_settings` - Singleton card-payment discount
//! - `tower_sessions.session` - Session storage (carts)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p timberline-cli -- migrate
//! ```
//!
//! Handlers never touch the pool directly. They go through the [`OrderStore`]
//! and [`DiscountStore`] seams so routes can be exercised against in-memory
//! stores in tests.

pub mod discounts;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use timberline_core::{DiscountCode, DiscountCodeId, DiscountSettings, OrderId};

use crate::models::{NewOrder, OrderCreation, OrderWithItems};

pub use discounts::DiscountRepository;
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate discount code).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Persistence of confirmed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Persist a paid order with its items, at most once per checkout session.
    ///
    /// If the order carries a discount code, its use counter is incremented
    /// in the same unit of work, and only when the order is newly written.
    async fn create_paid_order(&self, order: NewOrder) -> Result<OrderCreation, RepositoryError>;

    /// Fetch an order and its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError>;
}

/// Lookup of discount codes and the card-payment discount.
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Find a code by its case-insensitive text.
    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError>;

    /// Find a code by id.
    async fn find_code_by_id(
        &self,
        id: DiscountCodeId,
    ) -> Result<Option<DiscountCode>, RepositoryError>;

    /// The stored card-payment discount, `None` if never configured.
    async fn settings(&self) -> Result<Option<DiscountSettings>, RepositoryError>;

    /// Create or replace the card-payment discount.
    async fn save_settings(&self, settings: DiscountSettings) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed implementation of both stores.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_paid_order(&self, order: NewOrder) -> Result<OrderCreation, RepositoryError> {
        OrderRepository::new(&self.pool).create_paid(&order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        OrderRepository::new(&self.pool).get_with_items(id).await
    }
}

#[async_trait]
impl DiscountStore for PgStore {
    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        DiscountRepository::new(&self.pool).find_by_code(code).await
    }

    async fn find_code_by_id(
        &self,
        id: DiscountCodeId,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        DiscountRepository::new(&self.pool).find_by_id(id).await
    }

    async fn settings(&self) -> Result<Option<DiscountSettings>, RepositoryError> {
        DiscountRepository::new(&self.pool).get_settings().await
    }

    async fn save_settings(&self, settings: DiscountSettings) -> Result<(), RepositoryError> {
        DiscountRepository::new(&self.pool)
            .upsert_settings(settings)
            .await
    }
}
