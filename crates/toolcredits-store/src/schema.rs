//! Database schema definitions and column families.
//!
//! This module defines the column families used by both storage backends.

/// Column family names.
pub mod cf {
    /// Primary account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Ledger entries, keyed by `user_id || 0x00 || entry_id` (ULID).
    /// Scoped under the owning account and time-ordered within it.
    pub const LEDGER_ENTRIES: &str = "ledger_entries";

    /// Tool pricing catalog, keyed by `tool_key`.
    pub const TOOL_PRICING: &str = "tool_pricing";

    /// Usage records, keyed by `usage_id` (ULID).
    pub const USAGE_RECORDS: &str = "usage_records";

    /// Index: usage records by user, keyed by `user_id || 0x00 || usage_id`.
    /// Value is empty (index only).
    pub const USAGE_BY_USER: &str = "usage_by_user";

    /// Debit idempotency records, keyed by `user_id || 0x00 || idempotency_key`.
    pub const IDEMPOTENCY: &str = "idempotency";

    /// Purchases, keyed by the processor `session_id`.
    pub const PURCHASES: &str = "purchases";

    /// Index: purchases by user, keyed by `user_id || 0x00 || purchase_id`.
    /// Value is the purchase `session_id`.
    pub const PURCHASES_BY_USER: &str = "purchases_by_user";

    /// Processed payment-event markers, keyed by processor `event_id`.
    /// Value is the `session_id` the event applied.
    pub const PAYMENT_EVENTS: &str = "payment_events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::LEDGER_ENTRIES,
        cf::TOOL_PRICING,
        cf::USAGE_RECORDS,
        cf::USAGE_BY_USER,
        cf::IDEMPOTENCY,
        cf::PURCHASES,
        cf::PURCHASES_BY_USER,
        cf::PAYMENT_EVENTS,
    ]
}
