//! Session middleware configuration.
//!
//! Carts are kept in `tower-sessions` sessions. Production uses the
//! `PostgreSQL` store; tests pass a `MemoryStore`.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tl_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// # Arguments
///
/// * `store` - Session store (`PostgresStore` in production)
/// * `secure` - Whether cookies are marked `Secure` (HTTPS deployments)
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    secure: bool,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
