//! Administrative balance adjustment.

use toolcredits_core::{BillingError, LedgerEntry, Result, UserId};
use toolcredits_store::Store;

use crate::CreditEngine;

impl<S: Store> CreditEngine<S> {
    /// Apply a manual correction to a user's balance and return the new
    /// balance.
    ///
    /// The ledger entry's reason records the acting administrator. Lifetime
    /// counters are not changed.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `delta` is zero
    /// - `InvalidRequest` if `reason` or `admin` is blank
    /// - `AccountNotFound` if the account does not exist
    /// - `NegativeBalanceRejected` if the balance would drop below zero
    pub fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: i64,
        reason: &str,
        admin: &str,
    ) -> Result<i64> {
        if delta == 0 {
            return Err(BillingError::InvalidAmount(
                "adjustment delta must not be zero".into(),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BillingError::InvalidRequest(
                "adjustment reason is required".into(),
            ));
        }
        let admin = admin.trim();
        if admin.is_empty() {
            return Err(BillingError::InvalidRequest(
                "acting administrator is required".into(),
            ));
        }

        let result = self.store.transaction(|tx| -> Result<i64> {
            let mut account = tx
                .account(user_id)?
                .ok_or_else(|| BillingError::AccountNotFound {
                    user_id: user_id.to_string(),
                })?;

            account.apply_adjustment(delta)?;
            tx.put_account(&account)?;
            tx.append_ledger_entry(&LedgerEntry::admin_adjustment(
                user_id.clone(),
                delta,
                account.balance_credits,
                reason,
                admin,
            ))?;
            Ok(account.balance_credits)
        });

        match &result {
            Ok(balance_after) => tracing::info!(
                user_id = %user_id,
                delta,
                balance_after,
                admin,
                reason,
                "Balance adjusted"
            ),
            Err(e @ BillingError::NegativeBalanceRejected { .. }) => tracing::warn!(
                user_id = %user_id,
                delta,
                admin,
                error = %e,
                "Adjustment rejected"
            ),
            Err(_) => {}
        }

        result
    }
}
