//! Metered usage handlers.
//!
//! A tool calls `debit` before doing paid work, then reports the outcome
//! with `succeeded`, `failed` or `refund` using the returned usage id.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use toolcredits_core::{DebitOutcome, ToolKey, UsageId, UsageRecord, UserId};
use toolcredits_engine::RefundOutcome;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

/// Debit request from a metered tool.
#[derive(Debug, Deserialize)]
pub struct DebitRequest {
    /// User being charged.
    pub user_id: String,
    /// Contact email, used if the account has to be created.
    #[serde(default)]
    pub email: String,
    /// Tool being used.
    pub tool_key: String,
    /// Caller-generated key; retries with the same key are not charged again.
    pub idempotency_key: String,
}

/// Success report.
#[derive(Debug, Default, Deserialize)]
pub struct SucceededRequest {
    /// The tool's own job identifier.
    #[serde(default)]
    pub external_job_id: Option<String>,
}

/// Failure report.
#[derive(Debug, Default, Deserialize)]
pub struct FailedRequest {
    /// Why the tool failed.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Refund request.
#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    /// Reason recorded on the ledger entry.
    #[serde(default)]
    pub reason: String,
}

fn parse_usage_id(raw: &str) -> Result<UsageId, ApiError> {
    Ok(raw.parse::<UsageId>()?)
}

// ============================================================================
// Handlers
// ============================================================================

/// Charge a user for one tool use.
pub async fn debit(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<DebitRequest>,
) -> Result<Json<DebitOutcome>, ApiError> {
    let user_id = UserId::new(body.user_id)?;
    let tool_key = ToolKey::new(body.tool_key)?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        tool_key = %tool_key,
        idempotency_key = %body.idempotency_key,
        "Processing debit"
    );

    let outcome =
        state
            .engine
            .debit_for_tool_use(&user_id, &body.email, &tool_key, &body.idempotency_key)?;

    Ok(Json(outcome))
}

/// Mark a usage record as succeeded.
pub async fn mark_succeeded(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(usage_id): Path<String>,
    Json(body): Json<SucceededRequest>,
) -> Result<Json<UsageRecord>, ApiError> {
    let usage_id = parse_usage_id(&usage_id)?;
    let record = state
        .engine
        .mark_succeeded(&usage_id, body.external_job_id.as_deref())?;
    Ok(Json(record))
}

/// Mark a usage record as failed.
pub async fn mark_failed(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(usage_id): Path<String>,
    Json(body): Json<FailedRequest>,
) -> Result<Json<UsageRecord>, ApiError> {
    let usage_id = parse_usage_id(&usage_id)?;
    let record = state
        .engine
        .mark_failed(&usage_id, body.reason.as_deref())?;
    Ok(Json(record))
}

/// Refund a usage record. Refunding twice is not an error.
pub async fn refund(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(usage_id): Path<String>,
    Json(body): Json<RefundRequest>,
) -> Result<Json<RefundOutcome>, ApiError> {
    let usage_id = parse_usage_id(&usage_id)?;

    tracing::debug!(
        service = %auth.service_name,
        usage_id = %usage_id,
        "Processing refund"
    );

    let outcome = state.engine.refund(&usage_id, &body.reason)?;
    Ok(Json(outcome))
}

/// Get a usage record.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(usage_id): Path<String>,
) -> Result<Json<UsageRecord>, ApiError> {
    let usage_id = parse_usage_id(&usage_id)?;
    Ok(Json(state.engine.usage_record(&usage_id)?))
}
