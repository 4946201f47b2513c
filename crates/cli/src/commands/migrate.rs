//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! tl-cli migrate
//! ```
//!
//! # Migration Files
//!
//! Storefront migrations live in `crates/storefront/migrations/` and cover
//! discount codes and settings, orders and order items, and the session table
//! used by the cart.

use sqlx::PgPool;

use super::CliError;

/// Run storefront database migrations.
pub async fn storefront(pool: &PgPool) -> Result<(), CliError> {
    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;
    tracing::info!("Storefront migrations complete!");
    Ok(())
}
