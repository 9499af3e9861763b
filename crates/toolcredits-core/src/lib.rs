//! Core types and utilities for toolcredits.
//!
//! This crate provides the foundational types of the credit ledger:
//!
//! - **Identifiers**: `UserId`, `ToolKey`, `UsageId`, `LedgerEntryId`, `PurchaseId`
//! - **Accounts**: `Account`, `SIGNUP_GRANT_CREDITS`
//! - **Ledger**: `LedgerEntry`, `EntryType`
//! - **Pricing**: `ToolPricing`, `PricingUpdate`, `PricingSeed`
//! - **Usage**: `UsageRecord`, `UsageStatus`
//! - **Idempotency**: `IdempotencyRecord`, `DebitOutcome`
//! - **Purchases**: `Purchase`, `PaymentNotice`
//!
//! # Credit unit
//!
//! Credits are whole numbers stored as `i64`. A tool use costs a flat
//! number of credits set in the pricing catalog; there is no currency
//! conversion inside the ledger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod idempotency;
pub mod ids;
pub mod ledger;
pub mod pricing;
pub mod purchase;
pub mod usage;

pub use account::{Account, SIGNUP_GRANT_CREDITS};
pub use error::{BillingError, Result};
pub use idempotency::{
    validate_idempotency_key, DebitOutcome, IdempotencyRecord, MAX_IDEMPOTENCY_KEY_LEN,
};
pub use ids::{IdError, LedgerEntryId, PurchaseId, ToolKey, UsageId, UserId};
pub use ledger::{ledger_sum, EntryType, LedgerEntry};
pub use pricing::{default_catalog, PricingSeed, PricingUpdate, ToolPricing};
pub use purchase::{PaymentNotice, Purchase, PurchaseStatus};
pub use usage::{UsageRecord, UsageStatus};
