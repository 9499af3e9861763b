//! Read-only queries for the operator surface.

use serde::Serialize;

use toolcredits_core::{
    ledger_sum, Account, BillingError, LedgerEntry, Purchase, Result, UsageId, UsageRecord, UserId,
};
use toolcredits_store::{ScanOrder, Store};

use crate::CreditEngine;

/// Listing size used when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Upper bound on any listing.
pub const MAX_LIST_LIMIT: usize = 200;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Comparison of an account's running balance with its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Balance stored on the account.
    pub balance_credits: i64,
    /// Signed sum of every ledger delta.
    pub ledger_sum: i64,
    /// Number of ledger entries.
    pub entry_count: usize,
    /// Whether the two agree.
    pub consistent: bool,
}

impl<S: Store> CreditEngine<S> {
    /// Get an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the user has no account.
    pub fn account(&self, user_id: &UserId) -> Result<Account> {
        self.store
            .get_account(user_id)?
            .ok_or_else(|| BillingError::AccountNotFound {
                user_id: user_id.to_string(),
            })
    }

    /// Get a usage record.
    ///
    /// # Errors
    ///
    /// Returns `UsageRecordNotFound` if the record does not exist.
    pub fn usage_record(&self, usage_id: &UsageId) -> Result<UsageRecord> {
        self.store
            .get_usage(usage_id)?
            .ok_or_else(|| BillingError::UsageRecordNotFound {
                usage_id: usage_id.to_string(),
            })
    }

    /// A user's ledger, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the user has no account.
    pub fn list_ledger(&self, user_id: &UserId, limit: Option<usize>) -> Result<Vec<LedgerEntry>> {
        self.account(user_id)?;
        Ok(self.store.list_ledger_entries(
            user_id,
            ScanOrder::Descending,
            Some(clamp_limit(limit)),
        )?)
    }

    /// A user's usage records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the user has no account.
    pub fn list_usage(&self, user_id: &UserId, limit: Option<usize>) -> Result<Vec<UsageRecord>> {
        self.account(user_id)?;
        Ok(self.store.list_usage_by_user(user_id, clamp_limit(limit))?)
    }

    /// A user's purchases, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the user has no account.
    pub fn list_purchases(&self, user_id: &UserId, limit: Option<usize>) -> Result<Vec<Purchase>> {
        self.account(user_id)?;
        Ok(self
            .store
            .list_purchases_by_user(user_id, clamp_limit(limit))?)
    }

    /// Look up a purchase by processor session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails.
    pub fn purchase_by_session(&self, session_id: &str) -> Result<Option<Purchase>> {
        Ok(self.store.get_purchase(session_id)?)
    }

    /// Replay a user's ledger and compare it with the stored balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the user has no account.
    pub fn reconcile(&self, user_id: &UserId) -> Result<Reconciliation> {
        let account = self.account(user_id)?;
        let entries = self
            .store
            .list_ledger_entries(user_id, ScanOrder::Ascending, None)?;
        let sum = ledger_sum(&entries);

        let report = Reconciliation {
            balance_credits: account.balance_credits,
            ledger_sum: sum,
            entry_count: entries.len(),
            consistent: sum == account.balance_credits,
        };

        if !report.consistent {
            tracing::warn!(
                user_id = %user_id,
                balance = report.balance_credits,
                ledger_sum = report.ledger_sum,
                "Balance does not match ledger"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use toolcredits_core::PaymentNotice;

    use crate::test_support::{engine, tool, user};

    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(7)), 7);
    }

    #[test]
    fn listings_are_newest_first_and_limited() {
        let engine = engine();
        let alice = user("alice");
        let chat = tool("ai_chat");

        let ids: Vec<UsageId> = (0..5)
            .map(|i| {
                engine
                    .debit_for_tool_use(&alice, "", &chat, &format!("k{i}"))
                    .unwrap()
                    .usage_id
            })
            .collect();

        let usage = engine.list_usage(&alice, Some(2)).unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].id, ids[4]);
        assert_eq!(usage[1].id, ids[3]);

        let ledger = engine.list_ledger(&alice, Some(0)).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].balance_after, 75);
    }

    #[test]
    fn listings_require_an_account() {
        let engine = engine();
        let ghost = user("ghost");

        assert!(matches!(
            engine.list_ledger(&ghost, None),
            Err(BillingError::AccountNotFound { .. })
        ));
        assert!(matches!(
            engine.reconcile(&ghost),
            Err(BillingError::AccountNotFound { .. })
        ));
    }

    #[test]
    fn purchases_listed_and_found_by_session() {
        let engine = engine();
        let bob = user("bob");
        for n in 1..=3 {
            engine
                .apply_purchase(&PaymentNotice {
                    user_id: bob.clone(),
                    email: String::new(),
                    session_id: format!("cs_{n}"),
                    event_id: format!("evt_{n}"),
                    amount_paid_minor: 100 * n,
                    credits_granted: 10 * n,
                })
                .unwrap();
        }

        let purchases = engine.list_purchases(&bob, None).unwrap();
        let sessions: Vec<&str> = purchases.iter().map(|p| p.session_id.as_str()).collect();
        assert_eq!(sessions, vec!["cs_3", "cs_2", "cs_1"]);

        let found = engine.purchase_by_session("cs_2").unwrap().unwrap();
        assert_eq!(found.credits_granted, 20);
        assert!(engine.purchase_by_session("cs_9").unwrap().is_none());
    }

    #[test]
    fn reconcile_matches_after_mixed_activity() {
        let engine = engine();
        let carol = user("carol");
        let scraper = tool("brand_scraper");

        let first = engine.debit_for_tool_use(&carol, "", &scraper, "a").unwrap();
        engine.refund(&first.usage_id, "failed").unwrap();
        engine.debit_for_tool_use(&carol, "", &scraper, "b").unwrap();
        engine.adjust_balance(&carol, 7, "bonus", "ops").unwrap();

        let report = engine.reconcile(&carol).unwrap();
        assert!(report.consistent);
        assert_eq!(report.balance_credits, 57);
        assert_eq!(report.ledger_sum, 57);
        assert_eq!(report.entry_count, 5);
    }
}
