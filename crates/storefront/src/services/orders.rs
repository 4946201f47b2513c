//! Orders confirmed by the current visitor.
//!
//! Order details carry the customer's contact data, so the order page only
//! serves orders whose checkout was verified in the same session.

use tower_sessions::Session;

use timberline_core::OrderId;

/// Session key holding the ids of orders this visitor confirmed.
pub const CONFIRMED_ORDERS_KEY: &str = "confirmed_orders";

/// Oldest entries are dropped past this many.
const MAX_REMEMBERED: usize = 20;

/// Record that this session confirmed `id`.
///
/// # Errors
///
/// Returns the session error if the list cannot be read or written.
pub async fn remember(session: &Session, id: OrderId) -> Result<(), tower_sessions::session::Error> {
    let mut ids: Vec<OrderId> = session
        .get(CONFIRMED_ORDERS_KEY)
        .await?
        .unwrap_or_default();
    if ids.contains(&id) {
        return Ok(());
    }
    ids.push(id);
    if ids.len() > MAX_REMEMBERED {
        ids.remove(0);
    }
    session.insert(CONFIRMED_ORDERS_KEY, ids).await
}

/// Whether this session confirmed `id`.
///
/// # Errors
///
/// Returns the session error if the list cannot be read.
pub async fn confirmed_here(
    session: &Session,
    id: OrderId,
) -> Result<bool, tower_sessions::session::Error> {
    let ids: Option<Vec<OrderId>> = session.get(CONFIRMED_ORDERS_KEY).await?;
    Ok(ids.is_some_and(|ids| ids.contains(&id)))
}
