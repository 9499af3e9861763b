//! Credit ledger and metered billing engine for toolcredits.
//!
//! [`CreditEngine`] implements every balance-affecting operation on top of a
//! [`Store`]. Each public mutation is a single store transaction: it either
//! commits all of its account, ledger, usage, idempotency and purchase
//! writes, or none of them. Callers may invoke operations concurrently
//! without any locking of their own.
//!
//! # Example
//!
//! ```no_run
//! use toolcredits_core::{ToolKey, UserId};
//! use toolcredits_engine::{CreditEngine, EngineConfig};
//! use toolcredits_store::RocksStore;
//!
//! let store = RocksStore::open("/tmp/toolcredits-db").unwrap();
//! let engine = CreditEngine::new(store, EngineConfig::default());
//!
//! let user_id = UserId::new("user-1").unwrap();
//! let tool = ToolKey::new("ai_chat").unwrap();
//! let outcome = engine
//!     .debit_for_tool_use(&user_id, "user@example.com", &tool, "req-1")
//!     .unwrap();
//! engine.mark_succeeded(&outcome.usage_id, None).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod admin;
pub mod config;
mod debit;
mod lifecycle;
mod pricing;
mod purchase;
mod queries;

pub use config::EngineConfig;
pub use lifecycle::RefundOutcome;
pub use purchase::PurchaseOutcome;
pub use queries::{Reconciliation, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

use std::sync::Arc;

use toolcredits_core::{Account, LedgerEntry, Result, UserId};
use toolcredits_store::{Store, Tx};

/// The credit ledger engine.
pub struct CreditEngine<S> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S> Clone for CreditEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> CreditEngine<S> {
    /// Create an engine owning the given store.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create an engine over a store shared with other components.
    pub fn with_shared_store(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Create an account with the signup grant inside a running transaction.
fn open_account(tx: &mut Tx<'_>, user_id: &UserId, email: &str, grant: i64) -> Result<Account> {
    let account = Account::new(user_id.clone(), email, grant);
    tx.put_account(&account)?;
    if grant != 0 {
        tx.append_ledger_entry(&LedgerEntry::signup_grant(
            user_id.clone(),
            grant,
            account.balance_credits,
        ))?;
    }
    Ok(account)
}

#[cfg(test)]
pub(crate) mod test_support {
    use toolcredits_core::{PricingUpdate, ToolKey, UserId};
    use toolcredits_store::MemoryStore;

    use crate::{CreditEngine, EngineConfig};

    pub fn engine() -> CreditEngine<MemoryStore> {
        let engine = CreditEngine::new(MemoryStore::new(), EngineConfig::default());
        engine
            .seed_pricing(&toolcredits_core::default_catalog())
            .unwrap();
        engine
    }

    pub fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    pub fn tool(key: &str) -> ToolKey {
        ToolKey::new(key).unwrap()
    }

    pub fn price(engine: &CreditEngine<MemoryStore>, key: &str, credits: i64, active: bool) {
        engine
            .update_pricing(
                &tool(key),
                PricingUpdate {
                    label: None,
                    credits_per_use: credits,
                    cost_to_operator_cents_estimate: 1,
                    active,
                },
            )
            .unwrap();
    }
}
