//! Ledger entry types for toolcredits.
//!
//! Every change to an account's balance appends exactly one entry. Entries
//! are never edited or deleted; together they are the audit trail from which
//! the balance can be rebuilt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LedgerEntryId, ToolKey, UsageId, UserId};

/// An immutable record of one balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (time-ordered).
    pub id: LedgerEntryId,

    /// The account this entry belongs to.
    pub user_id: UserId,

    /// Kind of balance change.
    pub entry_type: EntryType,

    /// Signed change in credits. Positive = credit, negative = debit.
    pub delta: i64,

    /// Balance immediately after this entry was applied.
    pub balance_after: i64,

    /// Human-readable reason.
    pub reason: String,

    /// Tool that was used, for debits and refunds.
    #[serde(default)]
    pub tool_key: Option<ToolKey>,

    /// Usage record that was charged or refunded.
    #[serde(default)]
    pub usage_id: Option<UsageId>,

    /// Payment processor session that funded a purchase.
    #[serde(default)]
    pub purchase_session_id: Option<String>,

    /// Payment processor event that delivered a purchase.
    #[serde(default)]
    pub payment_event_id: Option<String>,

    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn base(
        user_id: UserId,
        entry_type: EntryType,
        delta: i64,
        balance_after: i64,
        reason: String,
    ) -> Self {
        Self {
            id: LedgerEntryId::generate(),
            user_id,
            entry_type,
            delta,
            balance_after,
            reason,
            tool_key: None,
            usage_id: None,
            purchase_session_id: None,
            payment_event_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create the one-off signup grant entry.
    #[must_use]
    pub fn signup_grant(user_id: UserId, amount: i64, balance_after: i64) -> Self {
        Self::base(
            user_id,
            EntryType::SignupGrant,
            amount,
            balance_after,
            format!("Signup grant of {amount} credits"),
        )
    }

    /// Create a tool-use debit entry. The delta is always negative.
    #[must_use]
    pub fn debit(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        tool_key: ToolKey,
        tool_label: &str,
        usage_id: UsageId,
    ) -> Self {
        let mut entry = Self::base(
            user_id,
            EntryType::Debit,
            -amount.abs(),
            balance_after,
            format!("Used {tool_label}"),
        );
        entry.tool_key = Some(tool_key);
        entry.usage_id = Some(usage_id);
        entry
    }

    /// Create a refund entry reversing a debit.
    #[must_use]
    pub fn refund(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        tool_key: ToolKey,
        usage_id: UsageId,
        reason: String,
    ) -> Self {
        let mut entry = Self::base(user_id, EntryType::Refund, amount, balance_after, reason);
        entry.tool_key = Some(tool_key);
        entry.usage_id = Some(usage_id);
        entry
    }

    /// Create a purchase entry.
    #[must_use]
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        session_id: String,
        event_id: String,
        amount_paid_minor: i64,
    ) -> Self {
        let mut entry = Self::base(
            user_id,
            EntryType::Purchase,
            amount,
            balance_after,
            format!("Purchased {amount} credits (paid {amount_paid_minor} minor units)"),
        );
        entry.purchase_session_id = Some(session_id);
        entry.payment_event_id = Some(event_id);
        entry
    }

    /// Create an administrative adjustment entry. The acting admin is
    /// recorded inside the reason.
    #[must_use]
    pub fn admin_adjustment(
        user_id: UserId,
        delta: i64,
        balance_after: i64,
        reason: &str,
        admin: &str,
    ) -> Self {
        Self::base(
            user_id,
            EntryType::AdminAdjustment,
            delta,
            balance_after,
            format!("{reason} (by {admin})"),
        )
    }
}

/// Type of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Credits issued once at account creation.
    SignupGrant,

    /// Credits bought through the payment processor.
    Purchase,

    /// Credits charged for a tool use.
    Debit,

    /// A reversed tool-use charge.
    Refund,

    /// Manual correction by an operator.
    AdminAdjustment,
}

impl EntryType {
    /// Get the entry type name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignupGrant => "signup_grant",
            Self::Purchase => "purchase",
            Self::Debit => "debit",
            Self::Refund => "refund",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// Sum the deltas of a set of entries.
#[must_use]
pub fn ledger_sum<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i64 {
    entries.into_iter().map(|entry| entry.delta).sum()
}
