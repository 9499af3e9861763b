//! Applying verified payments from the payment processor.

use serde::Serialize;

use toolcredits_core::{BillingError, LedgerEntry, PaymentNotice, Purchase, Result};
use toolcredits_store::{Store, Tx};

use crate::{open_account, CreditEngine};

/// Result of applying a payment notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "purchase", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// The payment was credited by this call.
    Applied(Purchase),
    /// The session or event had already been credited; nothing changed.
    AlreadyApplied(Purchase),
}

impl PurchaseOutcome {
    /// The purchase record, new or existing.
    #[must_use]
    pub fn purchase(&self) -> &Purchase {
        match self {
            Self::Applied(purchase) | Self::AlreadyApplied(purchase) => purchase,
        }
    }

    /// Whether this call credited the account.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Find a purchase already recorded for the notice's session or event.
fn existing_purchase(tx: &mut Tx<'_>, notice: &PaymentNotice) -> Result<Option<Purchase>> {
    if let Some(purchase) = tx.purchase(&notice.session_id)? {
        return Ok(Some(purchase));
    }
    match tx.payment_event(&notice.event_id)? {
        Some(session_id) => tx.purchase(&session_id)?.map(Some).ok_or_else(|| {
            BillingError::StorageUnavailable(format!(
                "payment event {} points at missing session {session_id}",
                notice.event_id
            ))
        }),
        None => Ok(None),
    }
}

impl<S: Store> CreditEngine<S> {
    /// Credit a verified payment to the user's account.
    ///
    /// Applying the same session or event again has no further effect and
    /// returns the original purchase. A user seen for the first time gets
    /// the signup grant as well as the purchased credits.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` / `InvalidAmount` if the notice is malformed
    /// - `StorageUnavailable` if the store fails
    pub fn apply_purchase(&self, notice: &PaymentNotice) -> Result<PurchaseOutcome> {
        notice.validate()?;
        let grant = self.config.signup_grant_credits;

        let (outcome, balance_after) =
            self.store.transaction(|tx| -> Result<(PurchaseOutcome, Option<i64>)> {
                if let Some(existing) = existing_purchase(tx, notice)? {
                    return Ok((PurchaseOutcome::AlreadyApplied(existing), None));
                }

                let mut account = match tx.account(&notice.user_id)? {
                    Some(account) => account,
                    None => open_account(tx, &notice.user_id, &notice.email, grant)?,
                };
                account.apply_purchase(notice.credits_granted)?;

                let purchase = Purchase::paid(notice);
                tx.put_account(&account)?;
                tx.append_ledger_entry(&LedgerEntry::purchase(
                    notice.user_id.clone(),
                    notice.credits_granted,
                    account.balance_credits,
                    notice.session_id.clone(),
                    notice.event_id.clone(),
                    notice.amount_paid_minor,
                ))?;
                tx.put_purchase(&purchase)?;

                Ok((
                    PurchaseOutcome::Applied(purchase),
                    Some(account.balance_credits),
                ))
            })?;

        let purchase = outcome.purchase();
        match balance_after {
            Some(balance_after) => tracing::info!(
                user_id = %purchase.user_id,
                session_id = %purchase.session_id,
                event_id = %purchase.event_id,
                credits_granted = purchase.credits_granted,
                balance_after,
                "Purchase applied"
            ),
            None => {
                if purchase.user_id != notice.user_id {
                    tracing::warn!(
                        session_id = %notice.session_id,
                        recorded_user = %purchase.user_id,
                        notified_user = %notice.user_id,
                        "Payment notice names a different user than the recorded purchase"
                    );
                }
                tracing::debug!(
                    session_id = %notice.session_id,
                    event_id = %notice.event_id,
                    "Purchase already applied"
                );
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use toolcredits_core::{EntryType, UserId};

    use crate::test_support::{engine, user};

    use super::*;

    fn notice(user_id: &UserId, session: &str, event: &str) -> PaymentNotice {
        PaymentNotice {
            user_id: user_id.clone(),
            email: "buyer@example.com".into(),
            session_id: session.into(),
            event_id: event.into(),
            amount_paid_minor: 999,
            credits_granted: 500,
        }
    }

    #[test]
    fn new_user_gets_grant_and_purchase() {
        let engine = engine();
        let alice = user("alice");

        let outcome = engine.apply_purchase(&notice(&alice, "cs_1", "evt_1")).unwrap();
        assert!(outcome.is_applied());

        let account = engine.account(&alice).unwrap();
        assert_eq!(account.balance_credits, 600);
        assert_eq!(account.purchased_credits, 500);
        assert_eq!(account.email, "buyer@example.com");

        let types: Vec<EntryType> = engine
            .list_ledger(&alice, None)
            .unwrap()
            .iter()
            .map(|e| e.entry_type)
            .collect();
        assert_eq!(types, vec![EntryType::Purchase, EntryType::SignupGrant]);
    }

    #[test]
    fn existing_account_is_credited() {
        let engine = engine();
        let bob = user("bob");
        engine.ensure_account(&bob, "").unwrap();

        engine.apply_purchase(&notice(&bob, "cs_1", "evt_1")).unwrap();

        let account = engine.account(&bob).unwrap();
        assert_eq!(account.balance_credits, 600);
        let newest = &engine.list_ledger(&bob, Some(1)).unwrap()[0];
        assert_eq!(newest.purchase_session_id.as_deref(), Some("cs_1"));
        assert_eq!(newest.payment_event_id.as_deref(), Some("evt_1"));
    }

    #[test]
    fn duplicate_session_or_event_is_ignored() {
        let engine = engine();
        let carol = user("carol");

        let first = engine.apply_purchase(&notice(&carol, "cs_1", "evt_1")).unwrap();
        let same = engine.apply_purchase(&notice(&carol, "cs_1", "evt_1")).unwrap();
        let same_event = engine.apply_purchase(&notice(&carol, "cs_2", "evt_1")).unwrap();
        let same_session = engine.apply_purchase(&notice(&carol, "cs_1", "evt_2")).unwrap();

        for outcome in [&same, &same_event, &same_session] {
            assert!(!outcome.is_applied());
            assert_eq!(outcome.purchase().id, first.purchase().id);
        }
        assert_eq!(engine.account(&carol).unwrap().balance_credits, 600);
        assert_eq!(engine.list_purchases(&carol, None).unwrap().len(), 1);
    }

    #[test]
    fn invalid_notice_is_rejected() {
        let engine = engine();
        let dave = user("dave");
        let mut bad = notice(&dave, "cs_1", "evt_1");
        bad.credits_granted = 0;

        assert!(matches!(
            engine.apply_purchase(&bad),
            Err(BillingError::InvalidAmount(_))
        ));
        assert!(engine.purchase_by_session("cs_1").unwrap().is_none());
    }

    #[test]
    fn oversized_grant_aborts_without_writes() {
        let engine = engine();
        let frank = user("frank");
        engine.ensure_account(&frank, "").unwrap();
        let huge = PaymentNotice {
            credits_granted: i64::MAX,
            ..notice(&frank, "cs_big", "evt_big")
        };
        huge.validate().unwrap();

        let err = engine.apply_purchase(&huge).unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert_eq!(engine.account(&frank).unwrap().balance_credits, 100);
        assert!(engine.purchase_by_session("cs_big").unwrap().is_none());
        assert_eq!(engine.list_ledger(&frank, None).unwrap().len(), 1);
    }
}
