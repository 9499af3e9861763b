//! Pricing catalog handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use toolcredits_core::{PricingUpdate, ToolKey, ToolPricing};

use crate::auth::{AdminAuth, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Catalog listing.
#[derive(Debug, Serialize)]
pub struct PricingResponse {
    /// Tools, ordered by key.
    pub tools: Vec<ToolPricing>,
}

/// List the tools that can currently be charged.
pub async fn active_pricing(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<PricingResponse>, ApiError> {
    let tools = state.engine.active_pricing()?;
    Ok(Json(PricingResponse { tools }))
}

/// List the whole catalog, inactive tools included.
pub async fn all_pricing(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<PricingResponse>, ApiError> {
    let tools = state.engine.all_pricing()?;
    Ok(Json(PricingResponse { tools }))
}

/// Create or replace a tool's pricing.
pub async fn update_pricing(
    State(state): State<Arc<AppState>>,
    auth: AdminAuth,
    Path(tool_key): Path<String>,
    Json(body): Json<PricingUpdate>,
) -> Result<Json<ToolPricing>, ApiError> {
    let tool_key = ToolKey::new(tool_key)?;

    tracing::info!(
        admin_id = %auth.admin_id,
        tool_key = %tool_key,
        credits_per_use = body.credits_per_use,
        active = body.active,
        "Admin updating pricing"
    );

    let pricing = state.engine.update_pricing(&tool_key, body)?;
    Ok(Json(pricing))
}
