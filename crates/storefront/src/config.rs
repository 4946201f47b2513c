//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the storefront (checkout redirect fallback)
//! - `STOREFRONT_ADMIN_TOKEN` - Bearer token for the back-office settings API (min 32 chars)
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `STRIPE_CURRENCY` - Charge currency (default: usd)
//! - `STRIPE_TIMEOUT_SECS` - Request timeout for Stripe calls (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_TRACES_SAMPLE_RATE` - Fraction of requests traced (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use timberline_core::CurrencyCode;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Bearer token accepted by the admin settings endpoints
    pub admin_token: SecretString,
    /// Stripe Checkout configuration
    pub stripe: StripeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: SecretString,
    /// API base URL, overridable for tests and proxies
    pub api_base: String,
    /// Currency every order is charged in
    pub currency: CurrencyCode,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let admin_token = get_validated_secret("STOREFRONT_ADMIN_TOKEN")?;
        validate_min_length(&admin_token, "STOREFRONT_ADMIN_TOKEN")?;

        let stripe = StripeConfig::from_env()?;
        let sentry_traces_sample_rate = get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")
            .parse::<f32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SENTRY_TRACES_SAMPLE_RATE".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            admin_token,
            stripe,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("STRIPE_CURRENCY", "usd")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STRIPE_CURRENCY".to_string(), e.to_string()))?;
        let timeout_secs = get_env_or_default("STRIPE_TIMEOUT_SECS", "15")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STRIPE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            api_base: get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            currency,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a token meets minimum length requirements.
fn validate_min_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_stripe_test_key_passes_strength_check() {
        let result = validate_secret_strength("sk_test_51Nq8bFJk2LmZ0pQrStUvWxYz", "STRIPE_SECRET_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-stripe-key", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_admin_token_too_short() {
        let token = SecretString::from("short");
        assert!(validate_min_length(&token, "STOREFRONT_ADMIN_TOKEN").is_err());
    }

    #[test]
    fn test_socket_addr_and_secure() {
        let config = crate::test_support::test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_stripe_config_debug_redacts_secret() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_test_super_secret_value"),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            currency: CurrencyCode::USD,
            timeout: Duration::from_secs(15),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_super_secret_value"));
    }
}
