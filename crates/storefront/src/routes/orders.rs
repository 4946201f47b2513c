//! Order lookup for the checkout success page.

use axum::{Json, extract::State, http::HeaderMap};
use tower_sessions::Session;
use tracing::instrument;

use timberline_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::OrderWithItems;
use crate::routes::ApiPath;
use crate::services::orders;
use crate::state::AppState;

/// Show an order with its items.
///
/// Served to the session that verified the order, or with the admin token.
/// Anyone else gets the same 404 as for an unknown id.
#[instrument(skip(state, session, headers))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let not_found = || AppError::NotFound(format!("order {id}"));

    let allowed = orders::confirmed_here(&session, id).await?
        || RequireAdmin::check(&headers, &state).is_ok();
    if !allowed {
        return Err(not_found());
    }

    state
        .orders()
        .get_order(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
