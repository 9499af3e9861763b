//! Account creation and the tool-use debit path.

use chrono::Utc;

use toolcredits_core::{
    validate_idempotency_key, Account, BillingError, DebitOutcome, IdempotencyRecord, LedgerEntry,
    Result, ToolKey, UsageRecord, UserId,
};
use toolcredits_store::Store;

use crate::{open_account, CreditEngine};

impl<S: Store> CreditEngine<S> {
    /// Return the user's account, creating it with the signup grant if this
    /// is the first contact.
    ///
    /// An existing account is returned unchanged, including its email.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails.
    pub fn ensure_account(&self, user_id: &UserId, email: &str) -> Result<Account> {
        let grant = self.config.signup_grant_credits;

        let (account, created) = self.store.transaction(|tx| -> Result<(Account, bool)> {
            match tx.account(user_id)? {
                Some(account) => Ok((account, false)),
                None => Ok((open_account(tx, user_id, email, grant)?, true)),
            }
        })?;

        if created {
            tracing::info!(
                user_id = %user_id,
                signup_grant = grant,
                "Account created"
            );
        }

        Ok(account)
    }

    /// Charge the user for one use of a tool.
    ///
    /// Charges at most once per `(user_id, idempotency_key)`: a repeated
    /// call returns the original outcome without touching the balance. The
    /// account is created with its signup grant if absent.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the idempotency key is blank or too long
    /// - `UnknownTool` / `ToolInactive` if the tool cannot be charged
    /// - `InsufficientCredits` if the balance is below the tool's price
    /// - `StorageUnavailable` if the store fails
    pub fn debit_for_tool_use(
        &self,
        user_id: &UserId,
        email: &str,
        tool_key: &ToolKey,
        idempotency_key: &str,
    ) -> Result<DebitOutcome> {
        validate_idempotency_key(idempotency_key)?;
        let grant = self.config.signup_grant_credits;
        let retention = self.config.idempotency_retention;

        let (outcome, replayed) = self.store.transaction(|tx| -> Result<(DebitOutcome, bool)> {
            if let Some(record) = tx.idempotency(user_id, idempotency_key)? {
                if !record.is_expired(retention, Utc::now()) {
                    if record.tool_key != *tool_key {
                        tracing::warn!(
                            user_id = %user_id,
                            idempotency_key,
                            original_tool = %record.tool_key,
                            requested_tool = %tool_key,
                            "Idempotency key reused for a different tool"
                        );
                    }
                    return Ok((record.outcome, true));
                }
            }

            let mut account = match tx.account(user_id)? {
                Some(account) => account,
                None => open_account(tx, user_id, email, grant)?,
            };

            let pricing = tx
                .pricing(tool_key)?
                .ok_or_else(|| BillingError::UnknownTool {
                    tool_key: tool_key.to_string(),
                })?;
            if !pricing.active {
                return Err(BillingError::ToolInactive {
                    tool_key: tool_key.to_string(),
                });
            }

            let price = pricing.credits_per_use;
            if !account.has_sufficient_credits(price) {
                return Err(BillingError::InsufficientCredits {
                    balance: account.balance_credits,
                    required: price,
                });
            }

            let usage = UsageRecord::started(
                user_id.clone(),
                &pricing,
                Some(idempotency_key.to_owned()),
            );
            account.apply_debit(price, pricing.cost_to_operator_cents_estimate)?;

            let outcome = DebitOutcome {
                usage_id: usage.id,
                credits_charged: price,
                balance_after: account.balance_credits,
            };

            tx.put_account(&account)?;
            tx.append_ledger_entry(&LedgerEntry::debit(
                user_id.clone(),
                price,
                account.balance_credits,
                tool_key.clone(),
                &pricing.label,
                usage.id,
            ))?;
            tx.put_usage(&usage)?;
            tx.put_idempotency(&IdempotencyRecord::new(
                user_id.clone(),
                idempotency_key.to_owned(),
                tool_key.clone(),
                outcome,
            ))?;

            Ok((outcome, false))
        })?;

        if replayed {
            tracing::debug!(
                user_id = %user_id,
                idempotency_key,
                usage_id = %outcome.usage_id,
                "Debit replayed from idempotency record"
            );
        } else {
            tracing::info!(
                user_id = %user_id,
                tool_key = %tool_key,
                usage_id = %outcome.usage_id,
                credits_charged = outcome.credits_charged,
                balance_after = outcome.balance_after,
                "Tool use debited"
            );
        }

        Ok(outcome)
    }
}
