//! Card-payment discount settings.

use rust_decimal::Decimal;
use sqlx::PgPool;

use timberline_core::DiscountSettings;
use timberline_storefront::db::discounts::DiscountRepository;

use super::CliError;

/// Print the current settings.
pub async fn show(pool: &PgPool) -> Result<(), CliError> {
    let settings = DiscountRepository::new(pool)
        .get_settings()
        .await?
        .unwrap_or_default();

    #[allow(clippy::print_stdout)]
    {
        println!("percentage: {}", settings.percentage);
        println!("active:     {}", settings.active);
    }
    Ok(())
}

/// Replace the settings.
///
/// A running storefront picks the change up within its settings cache TTL.
pub async fn set(pool: &PgPool, percentage: Decimal, active: bool) -> Result<(), CliError> {
    let settings =
        DiscountSettings::new(percentage, active).map_err(|e| CliError::Invalid(e.to_string()))?;
    DiscountRepository::new(pool).upsert_settings(settings).await?;
    tracing::info!(%percentage, active, "Discount settings updated");
    Ok(())
}
