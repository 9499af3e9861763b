//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use toolcredits_core::{BillingError, IdError};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The tool has no pricing entry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The tool is switched off.
    #[error("tool inactive: {0}")]
    ToolInactive(String),

    /// Account not found.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Usage record not found.
    #[error("usage record not found: {0}")]
    UsageNotFound(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// An adjustment would make the balance negative.
    #[error("adjustment would make the balance negative: balance={balance}, delta={delta}")]
    NegativeBalanceRejected {
        /// Current balance.
        balance: i64,
        /// Rejected delta.
        delta: i64,
    },

    /// The usage record cannot be refunded from its current status.
    #[error("{0}")]
    InvalidRefundState(String),

    /// The store is unavailable.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::UnknownTool(_) => (StatusCode::NOT_FOUND, "unknown_tool", self.to_string(), None),
            Self::ToolInactive(_) => (StatusCode::CONFLICT, "tool_inactive", self.to_string(), None),
            Self::AccountNotFound(_) => (
                StatusCode::NOT_FOUND,
                "account_not_found",
                self.to_string(),
                None,
            ),
            Self::UsageNotFound(_) => (
                StatusCode::NOT_FOUND,
                "usage_not_found",
                self.to_string(),
                None,
            ),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::NegativeBalanceRejected { balance, delta } => (
                StatusCode::CONFLICT,
                "negative_balance_rejected",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "delta": delta
                })),
            ),
            Self::InvalidRefundState(msg) => (
                StatusCode::CONFLICT,
                "invalid_refund_state",
                msg.clone(),
                None,
            ),
            Self::StorageUnavailable(msg) => {
                tracing::error!(error = %msg, "Storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    "The ledger is temporarily unavailable".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::UnknownTool { tool_key } => Self::UnknownTool(tool_key),
            BillingError::ToolInactive { tool_key } => Self::ToolInactive(tool_key),
            BillingError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            BillingError::AccountNotFound { user_id } => Self::AccountNotFound(user_id),
            BillingError::NegativeBalanceRejected { balance, delta } => {
                Self::NegativeBalanceRejected { balance, delta }
            }
            BillingError::UsageRecordNotFound { usage_id } => Self::UsageNotFound(usage_id),
            err @ BillingError::InvalidRefundState { .. } => Self::InvalidRefundState(err.to_string()),
            BillingError::InvalidAmount(msg) | BillingError::InvalidRequest(msg) => {
                Self::BadRequest(msg)
            }
            BillingError::InvalidId(err) => err.into(),
            BillingError::StorageUnavailable(msg) => Self::StorageUnavailable(msg),
        }
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use toolcredits_core::UsageStatus;

    use super::*;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn insufficient_credits_is_payment_required() {
        let err: ApiError = BillingError::InsufficientCredits {
            balance: 10,
            required: 50,
        }
        .into();

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], "insufficient_credits");
        assert_eq!(body["error"]["details"]["balance"], 10);
        assert_eq!(body["error"]["details"]["required"], 50);
    }

    #[tokio::test]
    async fn refund_state_is_conflict() {
        let err: ApiError = BillingError::InvalidRefundState {
            usage_id: "u1".into(),
            status: UsageStatus::Unknown,
        }
        .into();

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "invalid_refund_state");
    }

    #[tokio::test]
    async fn storage_details_are_not_leaked() {
        let err: ApiError = BillingError::StorageUnavailable("IO error: /data".into()).into();

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/data"));
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request() {
        let err: ApiError = BillingError::InvalidAmount("delta must not be zero".into()).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "delta must not be zero");
        assert!(body["error"].get("details").is_none());
    }
}
