//! Tool pricing catalog types.
//!
//! Pricing is a flat integer credit cost per tool use plus an estimate of
//! what the use costs the operator. Usage records snapshot both values at
//! charge time, so editing the catalog never changes past charges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillingError, Result, ToolKey};

/// Catalog entry for one metered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPricing {
    /// Catalog key.
    pub tool_key: ToolKey,

    /// Human-readable name used in ledger reasons.
    pub label: String,

    /// Inactive tools reject debits.
    pub active: bool,

    /// Credits charged per use. Never negative.
    pub credits_per_use: i64,

    /// Estimated operator cost per use, in cents. Never negative.
    pub cost_to_operator_cents_estimate: i64,

    /// When the entry was last written.
    pub updated_at: DateTime<Utc>,
}

/// Operator-supplied values for a pricing upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingUpdate {
    /// New label. Keeps the existing label (or the tool key) when absent.
    #[serde(default)]
    pub label: Option<String>,

    /// Credits charged per use.
    pub credits_per_use: i64,

    /// Estimated operator cost per use, in cents.
    #[serde(default)]
    pub cost_to_operator_cents_estimate: i64,

    /// Whether the tool accepts debits.
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl PricingUpdate {
    /// Check the update for negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.credits_per_use < 0 {
            return Err(BillingError::InvalidAmount(format!(
                "credits_per_use must be non-negative, got {}",
                self.credits_per_use
            )));
        }
        if self.cost_to_operator_cents_estimate < 0 {
            return Err(BillingError::InvalidAmount(format!(
                "cost_to_operator_cents_estimate must be non-negative, got {}",
                self.cost_to_operator_cents_estimate
            )));
        }
        Ok(())
    }

    /// Build the catalog entry this update produces over `existing`.
    #[must_use]
    pub fn apply(self, tool_key: ToolKey, existing: Option<&ToolPricing>) -> ToolPricing {
        let label = self
            .label
            .filter(|label| !label.trim().is_empty())
            .or_else(|| existing.map(|p| p.label.clone()))
            .unwrap_or_else(|| tool_key.to_string());

        ToolPricing {
            tool_key,
            label,
            active: self.active,
            credits_per_use: self.credits_per_use,
            cost_to_operator_cents_estimate: self.cost_to_operator_cents_estimate,
            updated_at: Utc::now(),
        }
    }
}

/// A catalog seed entry, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSeed {
    /// Catalog key.
    pub tool_key: ToolKey,

    /// Pricing values.
    #[serde(flatten)]
    pub pricing: PricingUpdate,
}

/// The catalog shipped with a fresh deployment.
#[must_use]
pub fn default_catalog() -> Vec<PricingSeed> {
    let seed = |key: &str, label: &str, credits: i64, cost: i64| -> Option<PricingSeed> {
        Some(PricingSeed {
            tool_key: ToolKey::new(key).ok()?,
            pricing: PricingUpdate {
                label: Some(label.to_string()),
                credits_per_use: credits,
                cost_to_operator_cents_estimate: cost,
                active: true,
            },
        })
    };

    [
        seed("brand_scraper", "Brand Scraper", 50, 12),
        seed("web_scraper", "Web Scraper", 10, 3),
        seed("ai_chat", "AI Chat", 5, 2),
        seed("budget_app", "Budgeting App", 20, 1),
    ]
    .into_iter()
    .flatten()
    .collect()
}
