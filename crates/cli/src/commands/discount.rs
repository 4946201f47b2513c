//! Discount code management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use timberline_core::DiscountKind;
use timberline_storefront::db::discounts::{DiscountRepository, NewDiscountCode};

use super::CliError;

/// Create a discount code.
pub async fn create(
    pool: &PgPool,
    code: String,
    kind: DiscountKind,
    value: Decimal,
    max_uses: Option<i32>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), CliError> {
    let new = validate(code, kind, value, max_uses)?;
    let created = DiscountRepository::new(pool)
        .create(&NewDiscountCode { expires_at, ..new })
        .await?;
    tracing::info!(
        id = %created.id,
        code = %created.code,
        kind = %created.kind,
        value = %created.value,
        "Discount code created"
    );
    Ok(())
}

fn validate(
    code: String,
    kind: DiscountKind,
    value: Decimal,
    max_uses: Option<i32>,
) -> Result<NewDiscountCode, CliError> {
    let code = code.trim().to_owned();
    if code.is_empty()
        || !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CliError::Invalid(
            "code must be letters, digits, '-' or '_'".to_owned(),
        ));
    }
    if value <= Decimal::ZERO {
        return Err(CliError::Invalid("value must be positive".to_owned()));
    }
    if kind == DiscountKind::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(CliError::Invalid("percentage cannot exceed 100".to_owned()));
    }
    if max_uses.is_some_and(|uses| uses < 1) {
        return Err(CliError::Invalid("max uses must be at least 1".to_owned()));
    }
    Ok(NewDiscountCode {
        code,
        kind,
        value,
        max_uses,
        expires_at: None,
    })
}

/// Print every discount code.
pub async fn list(pool: &PgPool) -> Result<(), CliError> {
    let codes = DiscountRepository::new(pool).list().await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<20} {:<10} {:>8} {:>11} {:<8} EXPIRES",
            "CODE", "KIND", "VALUE", "USES", "ACTIVE"
        );
        for code in codes {
            let uses = code.max_uses.map_or_else(
                || code.current_uses.to_string(),
                |max| format!("{}/{max}", code.current_uses),
            );
            let expires = code
                .expires_at
                .map_or_else(|| "-".to_owned(), |at| at.to_rfc3339());
            println!(
                "{:<20} {:<10} {:>8} {:>11} {:<8} {expires}",
                code.code,
                code.kind.as_str(),
                code.value,
                uses,
                code.active
            );
        }
    }
    Ok(())
}

/// Deactivate a discount code.
pub async fn deactivate(pool: &PgPool, code: &str) -> Result<(), CliError> {
    DiscountRepository::new(pool).deactivate(code).await?;
    tracing::info!(code, "Discount code deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_code() {
        let new = validate(
            "  SPRING10 ".to_owned(),
            DiscountKind::Percentage,
            Decimal::from(10),
            Some(5),
        );
        assert!(matches!(new, Ok(NewDiscountCode { ref code, .. }) if code == "SPRING10"));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let pct = DiscountKind::Percentage;
        assert!(validate("SPRING 10".to_owned(), pct, Decimal::from(10), None).is_err());
        assert!(validate(String::new(), pct, Decimal::from(10), None).is_err());
        assert!(validate("BIG".to_owned(), pct, Decimal::from(101), None).is_err());
        assert!(validate("ZERO".to_owned(), pct, Decimal::ZERO, None).is_err());
        assert!(validate("NONE".to_owned(), pct, Decimal::from(10), Some(0)).is_err());
        assert!(
            validate("FIFTY".to_owned(), DiscountKind::Fixed, Decimal::from(150), None).is_ok()
        );
    }
}
