//! Discount settings route handlers.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use timberline_core::DiscountSettings;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::ApiJson;
use crate::state::AppState;

/// Settings update body.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub percentage: Decimal,
    pub active: bool,
}

/// Current card-payment discount settings.
pub async fn show(State(state): State<AppState>) -> Result<Json<DiscountSettings>> {
    Ok(Json(state.discounts().current().await?))
}

/// Replace the card-payment discount settings.
#[instrument(skip(state, _admin))]
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiJson(request): ApiJson<UpdateSettingsRequest>,
) -> Result<Json<DiscountSettings>> {
    let settings = DiscountSettings {
        percentage: request.percentage,
        active: request.active,
    };
    Ok(Json(state.discounts().update(settings).await?))
}
