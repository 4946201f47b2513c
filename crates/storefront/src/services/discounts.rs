//! Discount settings provider and discount code redemption.
//!
//! Settings are read on every cart view and checkout but change only when the
//! back office edits them, so they are cached (60-second TTL) and the cache
//! entry is dropped on every update.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use thiserror::Error;
use tracing::instrument;

use timberline_core::discount::{DiscountRejection, SettingsError};
use timberline_core::{AppliedDiscount, DiscountCode, DiscountCodeId, DiscountSettings};

use crate::db::{DiscountStore, RepositoryError};

const SETTINGS_TTL: Duration = Duration::from_secs(60);

/// Errors from the discount service.
#[derive(Debug, Error)]
pub enum DiscountError {
    #[error("{0}")]
    InvalidSettings(#[from] SettingsError),
    #[error("discount code {0} not found")]
    UnknownCode(String),
    #[error("{0}")]
    Rejected(#[from] DiscountRejection),
    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

/// Reads and updates discount settings, and redeems discount codes.
#[derive(Clone)]
pub struct DiscountService {
    store: Arc<dyn DiscountStore>,
    cache: Cache<(), DiscountSettings>,
}

impl DiscountService {
    #[must_use]
    pub fn new(store: Arc<dyn DiscountStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(SETTINGS_TTL)
            .build();
        Self { store, cache }
    }

    /// Current card-payment discount; inactive at 0% if never configured.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::Repository` if the settings cannot be read.
    pub async fn current(&self) -> Result<DiscountSettings, DiscountError> {
        if let Some(settings) = self.cache.get(&()).await {
            return Ok(settings);
        }

        let settings = self.store.settings().await?.unwrap_or_default();
        self.cache.insert((), settings).await;
        Ok(settings)
    }

    /// Validate and store new settings.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::InvalidSettings` if the percentage is outside
    /// 0..=100, or `DiscountError::Repository` if the write fails.
    #[instrument(skip(self))]
    pub async fn update(&self, settings: DiscountSettings) -> Result<DiscountSettings, DiscountError> {
        settings.validate()?;
        self.store.save_settings(settings).await?;
        self.cache.invalidate(&()).await;
        tracing::info!(
            percentage = %settings.percentage,
            active = settings.active,
            "Discount settings updated"
        );
        Ok(settings)
    }

    /// Look up a code and check it can be applied right now.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::UnknownCode` if no such code exists and
    /// `DiscountError::Rejected` if it is inactive, expired or used up.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str) -> Result<AppliedDiscount, DiscountError> {
        let found = self
            .store
            .find_code(code)
            .await?
            .ok_or_else(|| DiscountError::UnknownCode(code.trim().to_owned()))?;
        found.check_redeemable(Utc::now())?;
        Ok(found.to_applied())
    }

    /// Re-check a code carried by an order draft before it is charged.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::UnknownCode` if no code has this id and
    /// `DiscountError::Rejected` if it can no longer be applied.
    #[instrument(skip(self))]
    pub async fn redeem_id(&self, id: DiscountCodeId) -> Result<DiscountCode, DiscountError> {
        let found = self
            .store
            .find_code_by_id(id)
            .await?
            .ok_or_else(|| DiscountError::UnknownCode(id.to_string()))?;
        found.check_redeemable(Utc::now())?;
        Ok(found)
    }
}
