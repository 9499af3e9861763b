//! Engine configuration.

use chrono::Duration;
use toolcredits_core::{BillingError, Result, SIGNUP_GRANT_CREDITS};

/// Settings that shape ledger behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Credits granted once when an account is created.
    pub signup_grant_credits: i64,

    /// How long a debit idempotency record answers retries.
    ///
    /// `None` keeps records forever. Once a record is older than the
    /// window, a request reusing its key is treated as a new debit.
    pub idempotency_retention: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signup_grant_credits: SIGNUP_GRANT_CREDITS,
            idempotency_retention: None,
        }
    }
}

impl EngineConfig {
    /// Bound idempotency retention to the given number of hours.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidAmount`] if `hours` is not positive or
    /// does not fit in a duration.
    pub fn with_retention_hours(mut self, hours: Option<i64>) -> Result<Self> {
        self.idempotency_retention = match hours {
            None => None,
            Some(h) if h > 0 => Some(Duration::try_hours(h).ok_or_else(|| {
                BillingError::InvalidAmount(format!("retention of {h} hours is out of range"))
            })?),
            Some(h) => {
                return Err(BillingError::InvalidAmount(format!(
                    "retention must be positive, got {h} hours"
                )))
            }
        };
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_hours_are_bounded() {
        let config = EngineConfig::default().with_retention_hours(Some(24)).unwrap();
        assert_eq!(config.idempotency_retention, Some(Duration::hours(24)));

        assert!(EngineConfig::default()
            .with_retention_hours(None)
            .unwrap()
            .idempotency_retention
            .is_none());
    }

    #[test]
    fn out_of_range_retention_is_rejected() {
        assert!(matches!(
            EngineConfig::default().with_retention_hours(Some(i64::MAX)),
            Err(BillingError::InvalidAmount(_))
        ));
        assert!(matches!(
            EngineConfig::default().with_retention_hours(Some(0)),
            Err(BillingError::InvalidAmount(_))
        ));
    }
}
