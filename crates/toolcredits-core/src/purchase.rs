//! Purchase types for toolcredits.
//!
//! A purchase is an externally verified payment turned into credits. It is
//! keyed by the payment processor's session id; a separate marker keyed by
//! the processor's event id makes webhook redelivery harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillingError, PurchaseId, Result, UserId};

/// A verified payment delivered by the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotice {
    /// The paying user.
    pub user_id: UserId,
    /// Contact email from checkout.
    pub email: String,
    /// Processor checkout session / transaction id.
    pub session_id: String,
    /// Processor event id. Unique per real-world payment event.
    pub event_id: String,
    /// Amount paid in minor currency units.
    pub amount_paid_minor: i64,
    /// Credits to grant.
    pub credits_granted: i64,
}

impl PaymentNotice {
    /// Check the notice for empty references and invalid amounts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for missing references and `InvalidAmount`
    /// for a negative payment or a non-positive grant.
    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(BillingError::InvalidRequest(
                "session_id must not be empty".into(),
            ));
        }
        if self.event_id.trim().is_empty() {
            return Err(BillingError::InvalidRequest("event_id must not be empty".into()));
        }
        if self.amount_paid_minor < 0 {
            return Err(BillingError::InvalidAmount(
                "amount_paid must be non-negative".into(),
            ));
        }
        if self.credits_granted <= 0 {
            return Err(BillingError::InvalidAmount(
                "credits_granted must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A completed, applied purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique purchase ID (time-ordered).
    pub id: PurchaseId,
    /// The paying user.
    pub user_id: UserId,
    /// Contact email from checkout.
    pub email: String,
    /// Processor session id (primary idempotency key).
    pub session_id: String,
    /// Processor event id that delivered the payment.
    pub event_id: String,
    /// Amount paid in minor currency units.
    pub amount_paid_minor: i64,
    /// Credits granted.
    pub credits_granted: i64,
    /// Purchase status.
    pub status: PurchaseStatus,
    /// When the purchase was applied.
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// Build a paid purchase from a verified notice.
    #[must_use]
    pub fn paid(notice: &PaymentNotice) -> Self {
        Self {
            id: PurchaseId::generate(),
            user_id: notice.user_id.clone(),
            email: notice.email.clone(),
            session_id: notice.session_id.clone(),
            event_id: notice.event_id.clone(),
            amount_paid_minor: notice.amount_paid_minor,
            credits_granted: notice.credits_granted,
            status: PurchaseStatus::Paid,
            created_at: Utc::now(),
        }
    }
}

/// Status of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Payment confirmed and credits granted.
    Paid,
}
