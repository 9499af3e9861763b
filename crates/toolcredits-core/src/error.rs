//! Error types for toolcredits.

use crate::ids::IdError;
use crate::usage::UsageStatus;

/// Result type for toolcredits operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in toolcredits operations.
///
/// Every variant aborts the transaction that produced it; no partial
/// ledger, balance or usage writes survive an error.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The tool key has no pricing entry.
    #[error("unknown tool: {tool_key}")]
    UnknownTool {
        /// The tool key that was looked up.
        tool_key: String,
    },

    /// The tool exists but is switched off in the pricing catalog.
    #[error("tool inactive: {tool_key}")]
    ToolInactive {
        /// The inactive tool key.
        tool_key: String,
    },

    /// Insufficient credits for the operation.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Required amount in credits.
        required: i64,
    },

    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// An adjustment would take the balance below zero.
    #[error("negative balance rejected: balance={balance}, delta={delta}")]
    NegativeBalanceRejected {
        /// Balance before the adjustment.
        balance: i64,
        /// The rejected delta.
        delta: i64,
    },

    /// Usage record not found.
    #[error("usage record not found: {usage_id}")]
    UsageRecordNotFound {
        /// The usage ID that was not found.
        usage_id: String,
    },

    /// A refund was attempted on a record in a state that cannot be refunded.
    #[error("usage record {usage_id} cannot be refunded from status {status:?}")]
    InvalidRefundState {
        /// The usage record.
        usage_id: String,
        /// Its current status.
        status: UsageStatus,
    },

    /// Invalid amount (negative price, non-positive grant, zero adjustment...).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed request (empty reason, empty session id...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The backing store failed or could not commit.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl BillingError {
    /// Whether the caller should be told to buy more credits.
    #[must_use]
    pub const fn is_payment_required(&self) -> bool {
        matches!(self, Self::InsufficientCredits { .. })
    }

    /// Whether this is an infrastructure failure rather than a business outcome.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
