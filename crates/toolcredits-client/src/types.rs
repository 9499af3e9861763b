//! Request and response types for the toolcredits client.

use serde::{Deserialize, Serialize};

pub use toolcredits_core::{Account, DebitOutcome, Purchase, ToolPricing, UsageRecord, UsageStatus};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EnsureAccountRequest<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DebitRequest<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub tool_key: &'a str,
    pub idempotency_key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SucceededRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FailedRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RefundRequest<'a> {
    pub reason: &'a str,
}

/// A verified payment to apply.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    /// The paying user.
    pub user_id: String,
    /// Contact email from checkout.
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

/// Refund response.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundResponse {
    /// The usage record after the refund.
    pub record: UsageRecord,
    /// The owner's balance after the refund.
    pub balance_after: i64,
    /// `true` if an earlier request had already refunded the record.
    pub already_refunded: bool,
}

/// Whether a purchase was applied by this call or an earlier delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseResult {
    /// Credits were granted by this call.
    Applied,
    /// The session or event had already been applied.
    AlreadyApplied,
}

/// Purchase response.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseResponse {
    /// Outcome of the call.
    pub result: PurchaseResult,
    /// The stored purchase.
    pub purchase: Purchase,
}

/// Pricing catalog response.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingResponse {
    /// Tools in the catalog.
    pub tools: Vec<ToolPricing>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    pub(crate) fn detail_i64(&self, name: &str) -> i64 {
        self.details
            .as_ref()
            .and_then(|d| d.get(name))
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0)
    }
}
