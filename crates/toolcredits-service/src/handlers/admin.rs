//! Operator handlers: account inspection, listings and adjustments.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use toolcredits_core::{Account, LedgerEntry, Purchase, UsageRecord, UserId};
use toolcredits_engine::Reconciliation;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::ListQuery;
use crate::state::AppState;

/// Balance adjustment request.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    /// Signed change to the balance.
    pub delta: i64,
    /// Why the adjustment is made.
    pub reason: String,
}

/// Balance adjustment response.
#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    /// The adjusted user.
    pub user_id: String,
    /// Balance after the adjustment.
    pub balance_credits: i64,
}

/// Ledger listing.
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntry>,
}

/// Usage listing.
#[derive(Debug, Serialize)]
pub struct UsageListResponse {
    /// Usage records, newest first.
    pub records: Vec<UsageRecord>,
}

/// Purchase listing.
#[derive(Debug, Serialize)]
pub struct PurchaseListResponse {
    /// Purchases, newest first.
    pub purchases: Vec<Purchase>,
}

/// Get an account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let user_id = UserId::new(user_id)?;
    Ok(Json(state.engine.account(&user_id)?))
}

/// Apply a manual balance correction.
pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    auth: AdminAuth,
    Path(user_id): Path<String>,
    Json(body): Json<AdjustRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let user_id = UserId::new(user_id)?;

    let balance_credits =
        state
            .engine
            .adjust_balance(&user_id, body.delta, &body.reason, &auth.admin_id)?;

    Ok(Json(AdjustResponse {
        user_id: user_id.to_string(),
        balance_credits,
    }))
}

/// List a user's ledger entries.
pub async fn list_ledger(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<LedgerResponse>, ApiError> {
    let user_id = UserId::new(user_id)?;
    let entries = state.engine.list_ledger(&user_id, query.limit)?;
    Ok(Json(LedgerResponse { entries }))
}

/// List a user's usage records.
pub async fn list_usage(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UsageListResponse>, ApiError> {
    let user_id = UserId::new(user_id)?;
    let records = state.engine.list_usage(&user_id, query.limit)?;
    Ok(Json(UsageListResponse { records }))
}

/// List a user's purchases.
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PurchaseListResponse>, ApiError> {
    let user_id = UserId::new(user_id)?;
    let purchases = state.engine.list_purchases(&user_id, query.limit)?;
    Ok(Json(PurchaseListResponse { purchases }))
}

/// Compare a user's balance with their ledger.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(user_id): Path<String>,
) -> Result<Json<Reconciliation>, ApiError> {
    let user_id = UserId::new(user_id)?;
    Ok(Json(state.engine.reconcile(&user_id)?))
}
