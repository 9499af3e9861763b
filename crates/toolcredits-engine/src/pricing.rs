//! Pricing catalog operations.

use toolcredits_core::{PricingSeed, PricingUpdate, Result, ToolKey, ToolPricing};
use toolcredits_store::Store;

use crate::CreditEngine;

impl<S: Store> CreditEngine<S> {
    /// Tools that can currently be charged, ordered by tool key.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails.
    pub fn active_pricing(&self) -> Result<Vec<ToolPricing>> {
        let mut pricing = self.all_pricing()?;
        pricing.retain(|p| p.active);
        Ok(pricing)
    }

    /// The whole catalog, including inactive tools.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails.
    pub fn all_pricing(&self) -> Result<Vec<ToolPricing>> {
        Ok(self.store.list_pricing()?)
    }

    /// Create or replace a tool's pricing. Last write wins.
    ///
    /// Existing usage records keep the amounts they were charged at.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if a price is negative
    /// - `StorageUnavailable` if the store fails
    pub fn update_pricing(&self, tool_key: &ToolKey, update: PricingUpdate) -> Result<ToolPricing> {
        update.validate()?;

        let pricing = self.store.transaction(|tx| -> Result<ToolPricing> {
            let existing = tx.pricing(tool_key)?;
            let pricing = update.clone().apply(tool_key.clone(), existing.as_ref());
            tx.put_pricing(&pricing)?;
            Ok(pricing)
        })?;

        tracing::info!(
            tool_key = %tool_key,
            credits_per_use = pricing.credits_per_use,
            active = pricing.active,
            "Pricing updated"
        );

        Ok(pricing)
    }

    /// Insert catalog entries that do not exist yet and return how many
    /// were inserted. Entries already in the store are left alone.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if a seed has a negative price
    /// - `StorageUnavailable` if the store fails
    pub fn seed_pricing(&self, catalog: &[PricingSeed]) -> Result<usize> {
        for seed in catalog {
            seed.pricing.validate()?;
        }

        let inserted = self.store.transaction(|tx| -> Result<usize> {
            let mut inserted = 0;
            for seed in catalog {
                if tx.pricing(&seed.tool_key)?.is_none() {
                    tx.put_pricing(&seed.pricing.clone().apply(seed.tool_key.clone(), None))?;
                    inserted += 1;
                }
            }
            Ok(inserted)
        })?;

        if inserted > 0 {
            tracing::info!(inserted, "Pricing catalog seeded");
        }

        Ok(inserted)
    }
}
