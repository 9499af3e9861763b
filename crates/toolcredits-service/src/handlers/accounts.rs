//! Account handlers for service callers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use toolcredits_core::{Account, UserId};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Ensure-account request.
#[derive(Debug, Deserialize)]
pub struct EnsureAccountRequest {
    /// The user to look up or create.
    pub user_id: String,
    /// Contact email, stored only when the account is created.
    #[serde(default)]
    pub email: String,
}

/// Return the user's account, creating it with the signup grant on first
/// contact.
pub async fn ensure_account(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<EnsureAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    let user_id = UserId::new(body.user_id)?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        "Ensuring account"
    );

    let account = state.engine.ensure_account(&user_id, &body.email)?;
    Ok(Json(account))
}
