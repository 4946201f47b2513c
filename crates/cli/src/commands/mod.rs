//! CLI command implementations.
//!
//! Every command talks to the storefront database through the storefront
//! crate's repositories.

pub mod discount;
pub mod migrate;
pub mod orders;
pub mod settings;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use timberline_storefront::db::{self, RepositoryError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Input rejected before touching the database.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Connect to the storefront database.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
