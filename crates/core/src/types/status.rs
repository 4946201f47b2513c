//! Status and method enums shared by the checkout flow.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a persisted order.
///
/// Orders are only ever written once payment is confirmed, so `Paid` is the
/// state every new order starts in. The remaining states are set by
/// back-office tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Paid,
    Fulfilled,
    Cancelled,
    Refunded,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paid => write!(f, "paid"),
            Self::Fulfilled => write!(f, "fulfilled"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment on the hosted checkout page.
    Card,
    /// Bank transfer through the provider's customer balance.
    BankTransfer,
}

impl PaymentMethod {
    /// Wire tag used in JSON bodies and session metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "bank_transfer" => Ok(Self::BankTransfer),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_roundtrip() {
        for method in [PaymentMethod::Card, PaymentMethod::BankTransfer] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!("cash".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_serde_tag() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
    }

    #[test]
    fn test_order_status_default_is_paid() {
        assert_eq!(OrderStatus::default(), OrderStatus::Paid);
        assert_eq!(OrderStatus::Paid.to_string(), "paid");
    }
}
