//! Discount codes and the card-payment discount setting.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::DiscountCodeId;

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal (0-100).
    Percentage,
    /// `value` is an amount in the store currency.
    Fixed,
}

impl DiscountKind {
    /// Column value used in `discount_codes.kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("invalid discount kind: {s}")),
        }
    }
}

/// A discount code applied to the cart. At most one per cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub id: DiscountCodeId,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl AppliedDiscount {
    /// Amount taken off `subtotal`, never more than the subtotal itself.
    #[must_use]
    pub fn amount_off(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.kind {
            DiscountKind::Percentage => subtotal * self.value / Decimal::ONE_HUNDRED,
            DiscountKind::Fixed => self.value,
        };
        raw.min(subtotal)
            .max(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Percentage recorded on the order draft, if this is a percentage code.
    #[must_use]
    pub fn percentage(&self) -> Option<Decimal> {
        (self.kind == DiscountKind::Percentage).then_some(self.value)
    }
}

/// Why a discount code cannot be applied right now.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountRejection {
    #[error("discount code is not active")]
    Inactive,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code has reached its usage limit")]
    Exhausted,
}

/// A discount code as stored by the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: DiscountCodeId,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    /// Check whether the code may be applied at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`DiscountRejection`] that applies.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
        if !self.active {
            return Err(DiscountRejection::Inactive);
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(DiscountRejection::Expired);
        }
        if self.max_uses.is_some_and(|max| self.current_uses >= max) {
            return Err(DiscountRejection::Exhausted);
        }
        Ok(())
    }

    /// The cart-side view of this code.
    #[must_use]
    pub fn to_applied(&self) -> AppliedDiscount {
        AppliedDiscount {
            id: self.id,
            code: self.code.clone(),
            kind: self.kind,
            value: self.value,
        }
    }
}

/// Errors from validating [`DiscountSettings`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("percentage must be between 0 and 100 (got {0})")]
    PercentageOutOfRange(Decimal),
}

/// Storewide discount for paying by card. Singleton, edited by the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiscountSettings {
    pub percentage: Decimal,
    pub active: bool,
}

impl DiscountSettings {
    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PercentageOutOfRange`] outside 0..=100.
    pub fn new(percentage: Decimal, active: bool) -> Result<Self, SettingsError> {
        let settings = Self { percentage, active };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the percentage bounds.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PercentageOutOfRange`] outside 0..=100.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.percentage < Decimal::ZERO || self.percentage > Decimal::ONE_HUNDRED {
            return Err(SettingsError::PercentageOutOfRange(self.percentage));
        }
        Ok(())
    }

    /// The card discount to advertise and apply, if any.
    #[must_use]
    pub fn card_discount(&self) -> Option<Decimal> {
        (self.active && self.percentage > Decimal::ZERO).then_some(self.percentage)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn code(kind: DiscountKind, value: i64) -> DiscountCode {
        DiscountCode {
            id: DiscountCodeId::new(),
            code: "OAK10".to_owned(),
            kind,
            value: Decimal::from(value),
            max_uses: Some(5),
            current_uses: 0,
            active: true,
            expires_at: None,
        }
    }

    #[test]
    fn test_percentage_amount_off() {
        let applied = code(DiscountKind::Percentage, 10).to_applied();
        assert_eq!(applied.amount_off(Decimal::from(1300)), Decimal::from(130));
        assert_eq!(applied.percentage(), Some(Decimal::from(10)));
    }

    #[test]
    fn test_amount_off_rounds_half_away_from_zero() {
        let applied = code(DiscountKind::Percentage, 10).to_applied();
        assert_eq!(applied.amount_off(Decimal::new(25, 2)), Decimal::new(3, 2));
    }

    #[test]
    fn test_fixed_amount_capped_at_subtotal() {
        let applied = code(DiscountKind::Fixed, 500).to_applied();
        assert_eq!(applied.amount_off(Decimal::from(300)), Decimal::from(300));
        assert_eq!(applied.percentage(), None);
    }

    #[test]
    fn test_redeemable_checks() {
        let now = Utc::now();
        assert!(code(DiscountKind::Fixed, 1).check_redeemable(now).is_ok());

        let mut inactive = code(DiscountKind::Fixed, 1);
        inactive.active = false;
        assert_eq!(
            inactive.check_redeemable(now),
            Err(DiscountRejection::Inactive)
        );

        let mut expired = code(DiscountKind::Fixed, 1);
        expired.expires_at = Some(now - Duration::hours(1));
        assert_eq!(expired.check_redeemable(now), Err(DiscountRejection::Expired));

        let mut used_up = code(DiscountKind::Fixed, 1);
        used_up.current_uses = 5;
        assert_eq!(
            used_up.check_redeemable(now),
            Err(DiscountRejection::Exhausted)
        );
    }

    #[test]
    fn test_settings_bounds() {
        assert!(DiscountSettings::new(Decimal::from(5), true).is_ok());
        assert!(DiscountSettings::new(Decimal::from(101), true).is_err());
        assert!(DiscountSettings::new(Decimal::from(-1), false).is_err());
    }

    #[test]
    fn test_card_discount_only_when_active() {
        let on = DiscountSettings::new(Decimal::from(5), true).unwrap();
        let off = DiscountSettings::new(Decimal::from(5), false).unwrap();
        assert_eq!(on.card_discount(), Some(Decimal::from(5)));
        assert_eq!(off.card_discount(), None);
        assert_eq!(DiscountSettings::default().card_discount(), None);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("fixed".parse::<DiscountKind>().unwrap(), DiscountKind::Fixed);
        assert!("bogus".parse::<DiscountKind>().is_err());
    }
}
