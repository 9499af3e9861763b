//! Idempotency records for the debit path.
//!
//! The outcome of the first successful debit for a `(user, key)` pair is
//! persisted in the same transaction as the debit itself. A retry with the
//! same key is answered from this record instead of charging again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillingError, Result, ToolKey, UsageId, UserId};

/// Maximum length in bytes of a caller-supplied idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 256;

/// The result of a debit, as returned to the caller and replayed on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitOutcome {
    /// The usage record created by the debit.
    pub usage_id: UsageId,
    /// Credits charged.
    pub credits_charged: i64,
    /// Account balance right after the debit.
    pub balance_after: i64,
}

/// A persisted debit outcome keyed by `(user_id, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The user the key belongs to.
    pub user_id: UserId,
    /// The caller-supplied key.
    pub key: String,
    /// Tool charged by the original request.
    pub tool_key: ToolKey,
    /// The original outcome.
    pub outcome: DebitOutcome,
    /// When the original debit committed.
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Record the outcome of a debit.
    #[must_use]
    pub fn new(user_id: UserId, key: String, tool_key: ToolKey, outcome: DebitOutcome) -> Self {
        Self {
            user_id,
            key,
            tool_key,
            outcome,
            created_at: Utc::now(),
        }
    }

    /// Whether the record is older than the retention window.
    ///
    /// `None` means records never expire.
    #[must_use]
    pub fn is_expired(&self, retention: Option<Duration>, now: DateTime<Utc>) -> bool {
        retention.is_some_and(|window| now - self.created_at > window)
    }
}

/// Check a caller-supplied idempotency key.
///
/// # Errors
///
/// Returns `InvalidRequest` if the key is blank or too long.
pub fn validate_idempotency_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(BillingError::InvalidRequest(
            "idempotency key must not be empty".into(),
        ));
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(BillingError::InvalidRequest(format!(
            "idempotency key exceeds {MAX_IDEMPOTENCY_KEY_LEN} bytes"
        )));
    }
    Ok(())
}
