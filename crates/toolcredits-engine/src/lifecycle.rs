//! Usage lifecycle: success, failure and refund.

use serde::Serialize;

use toolcredits_core::{BillingError, LedgerEntry, Result, UsageId, UsageRecord, UsageStatus};
use toolcredits_store::{Store, Tx};

use crate::CreditEngine;

/// Result of a refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundOutcome {
    /// The usage record after the request.
    pub record: UsageRecord,
    /// The owner's balance after the request.
    pub balance_after: i64,
    /// `true` if the record had already been refunded and nothing changed.
    pub already_refunded: bool,
}

fn load_usage(tx: &mut Tx<'_>, usage_id: &UsageId) -> Result<UsageRecord> {
    tx.usage(usage_id)?
        .ok_or_else(|| BillingError::UsageRecordNotFound {
            usage_id: usage_id.to_string(),
        })
}

impl<S: Store> CreditEngine<S> {
    /// Mark a usage record as succeeded, optionally attaching the tool's
    /// job id. No balance effect.
    ///
    /// A refunded record is left as it is.
    ///
    /// # Errors
    ///
    /// Returns `UsageRecordNotFound` if the record does not exist.
    pub fn mark_succeeded(
        &self,
        usage_id: &UsageId,
        external_job_id: Option<&str>,
    ) -> Result<UsageRecord> {
        self.settle(usage_id, UsageStatus::Succeeded, |record| {
            if let Some(job_id) = external_job_id {
                record.external_job_id = Some(job_id.to_owned());
            }
        })
    }

    /// Mark a usage record as failed, recording why. No balance effect; the
    /// record can still be refunded.
    ///
    /// # Errors
    ///
    /// Returns `UsageRecordNotFound` if the record does not exist.
    pub fn mark_failed(&self, usage_id: &UsageId, reason: Option<&str>) -> Result<UsageRecord> {
        self.settle(usage_id, UsageStatus::Failed, |record| {
            if let Some(reason) = reason {
                record.failure_reason = Some(reason.to_owned());
            }
        })
    }

    fn settle(
        &self,
        usage_id: &UsageId,
        status: UsageStatus,
        annotate: impl Fn(&mut UsageRecord),
    ) -> Result<UsageRecord> {
        let (record, changed) = self.store.transaction(|tx| -> Result<(UsageRecord, bool)> {
            let mut record = load_usage(tx, usage_id)?;
            if matches!(record.status, UsageStatus::Refunded | UsageStatus::Unknown) {
                return Ok((record, false));
            }
            annotate(&mut record);
            record.transition(status);
            tx.put_usage(&record)?;
            Ok((record, true))
        })?;

        if changed {
            tracing::info!(
                usage_id = %usage_id,
                status = status.as_str(),
                "Usage record settled"
            );
        } else {
            tracing::warn!(
                usage_id = %usage_id,
                current = record.status.as_str(),
                requested = status.as_str(),
                "Ignoring status change on settled usage record"
            );
        }

        Ok(record)
    }

    /// Reverse the charge of a usage record.
    ///
    /// The credits and operator cost snapshotted on the record are returned
    /// to the account, whatever the tool costs today. Refunding an already
    /// refunded record succeeds without changing anything.
    ///
    /// # Errors
    ///
    /// - `UsageRecordNotFound` if the record does not exist
    /// - `InvalidRefundState` if the record's status cannot be refunded
    /// - `AccountNotFound` if the owning account is missing
    /// - `StorageUnavailable` if the store fails
    pub fn refund(&self, usage_id: &UsageId, reason: &str) -> Result<RefundOutcome> {
        let outcome = self.store.transaction(|tx| -> Result<RefundOutcome> {
            let mut record = load_usage(tx, usage_id)?;
            let mut account =
                tx.account(&record.user_id)?
                    .ok_or_else(|| BillingError::AccountNotFound {
                        user_id: record.user_id.to_string(),
                    })?;

            if record.status == UsageStatus::Refunded {
                return Ok(RefundOutcome {
                    balance_after: account.balance_credits,
                    record,
                    already_refunded: true,
                });
            }
            if !record.status.is_refundable() {
                return Err(BillingError::InvalidRefundState {
                    usage_id: usage_id.to_string(),
                    status: record.status,
                });
            }

            let reason = if reason.trim().is_empty() {
                format!("Refund for {}", record.tool_key)
            } else {
                reason.to_owned()
            };

            account.apply_refund(record.credits_charged, record.cost_to_operator_cents_estimate)?;
            record.refund_reason = Some(reason.clone());
            record.transition(UsageStatus::Refunded);

            tx.put_account(&account)?;
            tx.append_ledger_entry(&LedgerEntry::refund(
                record.user_id.clone(),
                record.credits_charged,
                account.balance_credits,
                record.tool_key.clone(),
                record.id,
                reason,
            ))?;
            tx.put_usage(&record)?;

            Ok(RefundOutcome {
                balance_after: account.balance_credits,
                record,
                already_refunded: false,
            })
        })?;

        if outcome.already_refunded {
            tracing::debug!(usage_id = %usage_id, "Refund replayed on refunded record");
        } else {
            tracing::info!(
                usage_id = %usage_id,
                user_id = %outcome.record.user_id,
                credits = outcome.record.credits_charged,
                balance_after = outcome.balance_after,
                "Usage refunded"
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use toolcredits_core::{EntryType, UserId};

    use crate::test_support::{engine, price, tool, user};

    use super::*;

    fn charged(engine: &CreditEngine<toolcredits_store::MemoryStore>, user_id: &UserId) -> UsageId {
        engine
            .debit_for_tool_use(user_id, "", &tool("brand_scraper"), "k1")
            .unwrap()
            .usage_id
    }

    #[test]
    fn mark_succeeded_attaches_job_id() {
        let engine = engine();
        let alice = user("alice");
        let usage_id = charged(&engine, &alice);

        let record = engine.mark_succeeded(&usage_id, Some("job-42")).unwrap();

        assert_eq!(record.status, UsageStatus::Succeeded);
        assert_eq!(record.external_job_id.as_deref(), Some("job-42"));
        assert_eq!(engine.account(&alice).unwrap().balance_credits, 50);
    }

    #[test]
    fn mark_failed_keeps_refund_possible() {
        let engine = engine();
        let bob = user("bob");
        let usage_id = charged(&engine, &bob);

        let record = engine.mark_failed(&usage_id, Some("timeout")).unwrap();
        assert_eq!(record.status, UsageStatus::Failed);
        assert_eq!(record.failure_reason.as_deref(), Some("timeout"));

        let outcome = engine.refund(&usage_id, "tool failed").unwrap();
        assert!(!outcome.already_refunded);
        assert_eq!(outcome.balance_after, 100);
    }

    #[test]
    fn unknown_usage_is_not_found() {
        let engine = engine();
        let missing = UsageId::generate();

        assert!(matches!(
            engine.mark_succeeded(&missing, None),
            Err(BillingError::UsageRecordNotFound { .. })
        ));
        assert!(matches!(
            engine.refund(&missing, "x"),
            Err(BillingError::UsageRecordNotFound { .. })
        ));
    }

    #[test]
    fn refund_is_idempotent() {
        let engine = engine();
        let carol = user("carol");
        let usage_id = charged(&engine, &carol);

        let first = engine.refund(&usage_id, "tool failed").unwrap();
        let second = engine.refund(&usage_id, "tool failed").unwrap();

        assert!(!first.already_refunded);
        assert!(second.already_refunded);
        assert_eq!(second.balance_after, 100);
        assert_eq!(second.record.status, UsageStatus::Refunded);

        let ledger = engine.list_ledger(&carol, None).unwrap();
        let refunds = ledger
            .iter()
            .filter(|e| e.entry_type == EntryType::Refund)
            .count();
        assert_eq!(refunds, 1);

        let account = engine.account(&carol).unwrap();
        assert_eq!(account.spent_credits, 0);
        assert_eq!(account.cost_to_operator_cents, 0);
    }

    #[test]
    fn refund_uses_snapshot_not_current_price() {
        let engine = engine();
        let dave = user("dave");
        let usage_id = charged(&engine, &dave);

        price(&engine, "brand_scraper", 75, true);
        let outcome = engine.refund(&usage_id, "").unwrap();

        assert_eq!(outcome.balance_after, 100);
        assert_eq!(outcome.record.refund_reason.as_deref(), Some("Refund for brand_scraper"));

        let newest = &engine.list_ledger(&dave, Some(1)).unwrap()[0];
        assert_eq!(newest.entry_type, EntryType::Refund);
        assert_eq!(newest.delta, 50);
    }

    #[test]
    fn refund_after_success_is_allowed() {
        let engine = engine();
        let erin = user("erin");
        let usage_id = charged(&engine, &erin);
        engine.mark_succeeded(&usage_id, None).unwrap();

        let outcome = engine.refund(&usage_id, "goodwill").unwrap();
        assert_eq!(outcome.balance_after, 100);
    }

    #[test]
    fn settled_refund_ignores_later_status_changes() {
        let engine = engine();
        let frank = user("frank");
        let usage_id = charged(&engine, &frank);
        engine.refund(&usage_id, "failed").unwrap();

        let record = engine.mark_succeeded(&usage_id, Some("late")).unwrap();
        assert_eq!(record.status, UsageStatus::Refunded);
        assert!(record.external_job_id.is_none());
    }

    #[test]
    fn unknown_status_cannot_be_refunded() {
        let engine = engine();
        let gina = user("gina");
        let usage_id = charged(&engine, &gina);

        engine
            .store()
            .transaction(|tx| -> Result<()> {
                let mut record = tx.usage(&usage_id)?.unwrap();
                record.status = UsageStatus::Unknown;
                tx.put_usage(&record)?;
                Ok(())
            })
            .unwrap();

        let err = engine.refund(&usage_id, "x").unwrap_err();
        assert!(matches!(
            err,
            BillingError::InvalidRefundState {
                status: UsageStatus::Unknown,
                ..
            }
        ));
        assert_eq!(engine.account(&gina).unwrap().balance_credits, 50);
    }

    #[test]
    fn refund_overflow_aborts_without_writes() {
        let engine = engine();
        let erin = user("erin");
        let usage_id = charged(&engine, &erin);
        engine
            .adjust_balance(&erin, i64::MAX - 50, "migration", "ops")
            .unwrap();
        let entries_before = engine.list_ledger(&erin, None).unwrap().len();

        let err = engine.refund(&usage_id, "tool failed").unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert_eq!(engine.account(&erin).unwrap().balance_credits, i64::MAX);
        assert_eq!(engine.list_ledger(&erin, None).unwrap().len(), entries_before);
        assert_eq!(
            engine.usage_record(&usage_id).unwrap().status,
            UsageStatus::Started
        );
    }
}
