//! Purchase application for the payment collaborator.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use toolcredits_core::{PaymentNotice, UserId};
use toolcredits_engine::PurchaseOutcome;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// A verified payment, as delivered by the payment collaborator.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// The paying user.
    pub user_id: String,
    /// Contact email from checkout.
    #[serde(default)]
    pub email: String,
    /// Checkout session id.
    pub session_id: String,
    /// Payment event id.
    pub event_id: String,
    /// Amount paid in minor currency units.
    pub amount_paid_minor: i64,
    /// Credits bought.
    pub credits_granted: i64,
}

/// Apply a verified payment. Redelivery of the same session or event is
/// answered with the original purchase.
pub async fn apply_purchase(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<PurchaseOutcome>, ApiError> {
    let notice = PaymentNotice {
        user_id: UserId::new(body.user_id)?,
        email: body.email,
        session_id: body.session_id,
        event_id: body.event_id,
        amount_paid_minor: body.amount_paid_minor,
        credits_granted: body.credits_granted,
    };

    tracing::debug!(
        service = %auth.service_name,
        user_id = %notice.user_id,
        session_id = %notice.session_id,
        event_id = %notice.event_id,
        "Processing purchase"
    );

    let outcome = state.engine.apply_purchase(&notice)?;
    Ok(Json(outcome))
}
