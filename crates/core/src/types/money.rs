//! Decimal money with minor-unit conversion.
//!
//! Amounts are held in the currency's standard unit (dollars, not cents) as
//! [`Decimal`]. Payment providers speak in minor units, so conversion in both
//! directions lives here and nowhere else.

use core::fmt;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of minor units per standard unit for every supported currency.
const MINOR_UNITS_PER_UNIT: i64 = 100;

/// Errors from money arithmetic and parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is negative where only non-negative amounts make sense.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount does not fit in an `i64` count of minor units.
    #[error("amount out of range: {0}")]
    OutOfRange(Decimal),
    /// Unknown ISO 4217 currency code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Lowercase code as payment providers expect it (e.g. `usd`).
    #[must_use]
    pub const fn as_provider_code(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_provider_code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            _ => Err(MoneyError::UnsupportedCurrency(s.to_owned())),
        }
    }
}

/// A non-negative amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    /// Create a money value in the standard unit.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Create a money value from a count of minor units (e.g. cents).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if `minor` is below zero.
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Result<Self, MoneyError> {
        Self::new(Decimal::new(minor, 2), currency)
    }

    /// Convert to minor units: multiply by 100 and round half away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if the result overflows `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        self.amount
            .checked_mul(Decimal::from(MINOR_UNITS_PER_UNIT))
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .ok_or(MoneyError::OutOfRange(self.amount))
    }

    /// Amount in the standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Currency of this amount.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency.as_provider_code().to_uppercase())
    }
}
