//! Usage record types for toolcredits.
//!
//! A usage record is created by a successful debit and follows the tool
//! invocation it paid for through its lifecycle:
//!
//! ```text
//! started ──► succeeded ──┐
//!    │                    │
//!    ├──────► failed ─────┼──► refunded
//!    └────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ToolKey, ToolPricing, UsageId, UserId};

/// One metered tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique usage ID (time-ordered).
    pub id: UsageId,

    /// The user who was charged.
    pub user_id: UserId,

    /// The tool that was used.
    pub tool_key: ToolKey,

    /// Credits charged, snapshotted from pricing at debit time. Immutable.
    pub credits_charged: i64,

    /// Operator cost estimate snapshotted at debit time. Immutable.
    pub cost_to_operator_cents_estimate: i64,

    /// Lifecycle status.
    pub status: UsageStatus,

    /// The calling tool's own job id, for correlation.
    #[serde(default)]
    pub external_job_id: Option<String>,

    /// Idempotency key of the debit that created this record.
    #[serde(default)]
    pub idempotency_key: Option<String>,

    /// Why the invocation failed, if it did.
    #[serde(default)]
    pub failure_reason: Option<String>,

    /// Why the charge was refunded, if it was.
    #[serde(default)]
    pub refund_reason: Option<String>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Create a `started` record charged at the given pricing.
    #[must_use]
    pub fn started(user_id: UserId, pricing: &ToolPricing, idempotency_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UsageId::generate(),
            user_id,
            tool_key: pricing.tool_key.clone(),
            credits_charged: pricing.credits_per_use,
            cost_to_operator_cents_estimate: pricing.cost_to_operator_cents_estimate,
            status: UsageStatus::Started,
            external_job_id: None,
            idempotency_key,
            failure_reason: None,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to a new status, stamping `updated_at`.
    pub fn transition(&mut self, status: UsageStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Lifecycle status of a usage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStatus {
    /// Charged; the tool is doing the work.
    Started,

    /// The tool delivered its work.
    Succeeded,

    /// The tool failed; a refund is expected.
    Failed,

    /// The charge was reversed.
    Refunded,

    /// A status written by a newer version of the system.
    #[serde(other)]
    Unknown,
}

impl UsageStatus {
    /// Get the status name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a refund may be applied from this status.
    #[must_use]
    pub const fn is_refundable(&self) -> bool {
        matches!(self, Self::Started | Self::Failed | Self::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PricingUpdate, ToolKey};

    fn pricing(credits: i64) -> ToolPricing {
        PricingUpdate {
            label: Some("Brand Scraper".into()),
            credits_per_use: credits,
            cost_to_operator_cents_estimate: 12,
            active: true,
        }
        .apply(ToolKey::new("brand_scraper").unwrap(), None)
    }

    #[test]
    fn started_record_snapshots_pricing() {
        let record = UsageRecord::started(
            UserId::new("user-1").unwrap(),
            &pricing(50),
            Some("k1".into()),
        );
        assert_eq!(record.status, UsageStatus::Started);
        assert_eq!(record.credits_charged, 50);
        assert_eq!(record.cost_to_operator_cents_estimate, 12);
        assert_eq!(record.idempotency_key.as_deref(), Some("k1"));
    }

    #[test]
    fn refundable_statuses() {
        assert!(UsageStatus::Started.is_refundable());
        assert!(UsageStatus::Failed.is_refundable());
        assert!(UsageStatus::Succeeded.is_refundable());
        assert!(!UsageStatus::Refunded.is_refundable());
        assert!(!UsageStatus::Unknown.is_refundable());
    }

    #[test]
    fn unrecognised_status_deserializes_as_unknown() {
        let status: UsageStatus = serde_json::from_str("\"disputed\"").unwrap();
        assert_eq!(status, UsageStatus::Unknown);
        let status: UsageStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, UsageStatus::Failed);
    }
}
