//! Account types for toolcredits.
//!
//! An account holds a user's prepaid credit balance together with lifetime
//! counters used for reporting and reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillingError, Result, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Credits granted exactly once when an account is first created.
pub const SIGNUP_GRANT_CREDITS: i64 = 100;

/// A prepaid credit account for a user.
///
/// `balance_credits` is a running counter. It must always equal the signed
/// sum of the account's ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The user ID.
    pub user_id: UserId,

    /// Contact email captured at first contact.
    pub email: String,

    /// Current credit balance. Never negative.
    pub balance_credits: i64,

    /// Lifetime credits bought through the payment processor.
    pub purchased_credits: i64,

    /// Lifetime credits spent on tool use, net of refunds.
    pub spent_credits: i64,

    /// Lifetime estimated operator cost of tool use, net of refunds.
    pub cost_to_operator_cents: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account holding the given signup grant.
    #[must_use]
    pub fn new(user_id: UserId, email: impl Into<String>, signup_grant: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email: email.into(),
            balance_credits: signup_grant,
            purchased_credits: 0,
            spent_credits: 0,
            cost_to_operator_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can pay for a charge of `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance_credits >= amount
    }

    /// Record a tool-use charge against the account.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidAmount`] if a counter would overflow.
    /// The account is left unchanged on error.
    pub fn apply_debit(&mut self, credits: i64, cost_cents: i64) -> Result<()> {
        let balance = checked(self.balance_credits.checked_sub(credits), "balance")?;
        let spent = checked(self.spent_credits.checked_add(credits), "spent credits")?;
        let cost = checked(
            self.cost_to_operator_cents.checked_add(cost_cents),
            "operator cost",
        )?;

        self.balance_credits = balance;
        self.spent_credits = spent;
        self.cost_to_operator_cents = cost;
        self.touch();
        Ok(())
    }

    /// Reverse a previous charge using its snapshotted amounts.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidAmount`] if the balance would overflow
    /// or a lifetime counter would go below zero.
    pub fn apply_refund(&mut self, credits: i64, cost_cents: i64) -> Result<()> {
        let balance = checked(self.balance_credits.checked_add(credits), "balance")?;
        let spent = non_negative(self.spent_credits.checked_sub(credits), "spent credits")?;
        let cost = non_negative(
            self.cost_to_operator_cents.checked_sub(cost_cents),
            "operator cost",
        )?;

        self.balance_credits = balance;
        self.spent_credits = spent;
        self.cost_to_operator_cents = cost;
        self.touch();
        Ok(())
    }

    /// Credit purchased credits to the account.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidAmount`] if a counter would overflow.
    pub fn apply_purchase(&mut self, credits: i64) -> Result<()> {
        let balance = checked(self.balance_credits.checked_add(credits), "balance")?;
        let purchased = checked(
            self.purchased_credits.checked_add(credits),
            "purchased credits",
        )?;

        self.balance_credits = balance;
        self.purchased_credits = purchased;
        self.touch();
        Ok(())
    }

    /// Apply an administrative correction. Lifetime counters are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NegativeBalanceRejected`] if the balance would
    /// go below zero, or [`BillingError::InvalidAmount`] on overflow.
    pub fn apply_adjustment(&mut self, delta: i64) -> Result<()> {
        let balance = checked(self.balance_credits.checked_add(delta), "balance")?;
        if balance < 0 {
            return Err(BillingError::NegativeBalanceRejected {
                balance: self.balance_credits,
                delta,
            });
        }

        self.balance_credits = balance;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn checked(value: Option<i64>, counter: &str) -> Result<i64> {
    value.ok_or_else(|| BillingError::InvalidAmount(format!("{counter} would overflow")))
}

fn non_negative(value: Option<i64>, counter: &str) -> Result<i64> {
    match checked(value, counter)? {
        v if v < 0 => Err(BillingError::InvalidAmount(format!(
            "{counter} would go below zero"
        ))),
        v => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn new_account_holds_signup_grant() {
        let account = Account::new(user(), "a@example.com", SIGNUP_GRANT_CREDITS);
        assert_eq!(account.balance_credits, 100);
        assert_eq!(account.purchased_credits, 0);
        assert_eq!(account.spent_credits, 0);
        assert_eq!(account.cost_to_operator_cents, 0);
    }

    #[test]
    fn account_sufficient_credits() {
        let account = Account::new(user(), "a@example.com", 50);
        assert!(account.has_sufficient_credits(49));
        assert!(account.has_sufficient_credits(50));
        assert!(!account.has_sufficient_credits(51));
    }

    #[test]
    fn debit_then_refund_restores_counters() {
        let mut account = Account::new(user(), "a@example.com", 100);
        account.apply_debit(40, 7).unwrap();
        assert_eq!(account.balance_credits, 60);
        assert_eq!(account.spent_credits, 40);
        assert_eq!(account.cost_to_operator_cents, 7);

        account.apply_refund(40, 7).unwrap();
        assert_eq!(account.balance_credits, 100);
        assert_eq!(account.spent_credits, 0);
        assert_eq!(account.cost_to_operator_cents, 0);
    }

    #[test]
    fn purchase_tracks_lifetime_purchased() {
        let mut account = Account::new(user(), "a@example.com", 100);
        account.apply_purchase(500).unwrap();
        assert_eq!(account.balance_credits, 600);
        assert_eq!(account.purchased_credits, 500);
    }

    #[test]
    fn purchase_overflow_leaves_account_unchanged() {
        let mut account = Account::new(user(), "a@example.com", 100);
        let before = account.clone();

        let err = account.apply_purchase(i64::MAX).unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert_eq!(account, before);
    }

    #[test]
    fn refund_overflow_is_rejected() {
        let mut account = Account::new(user(), "a@example.com", 100);
        account.apply_debit(50, 12).unwrap();
        account.apply_adjustment(i64::MAX - 50).unwrap();
        assert_eq!(account.balance_credits, i64::MAX);

        let err = account.apply_refund(50, 12).unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert_eq!(account.balance_credits, i64::MAX);
        assert_eq!(account.spent_credits, 50);
    }

    #[test]
    fn refund_larger_than_spent_is_reported() {
        let mut account = Account::new(user(), "a@example.com", 100);
        account.apply_debit(10, 2).unwrap();

        let err = account.apply_refund(20, 2).unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(ref msg) if msg.contains("spent")));
        assert_eq!(account.spent_credits, 10);
        assert_eq!(account.balance_credits, 90);
    }

    #[test]
    fn adjustment_below_zero_is_rejected() {
        let mut account = Account::new(user(), "a@example.com", 30);

        let err = account.apply_adjustment(-31).unwrap_err();

        assert!(matches!(
            err,
            BillingError::NegativeBalanceRejected {
                balance: 30,
                delta: -31
            }
        ));
        assert_eq!(account.balance_credits, 30);
    }
}
