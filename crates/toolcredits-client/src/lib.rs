//! Toolcredits client SDK.
//!
//! Metered tools use this crate to charge users before doing paid work and
//! to report how the work went.
//!
//! # Example
//!
//! ```no_run
//! use toolcredits_client::{ClientOptions, ToolCreditsClient};
//!
//! # async fn example() -> Result<(), toolcredits_client::ClientError> {
//! let client = ToolCreditsClient::with_options(
//!     "http://toolcredits.billing.svc:8080",
//!     "your-service-api-key",
//!     ClientOptions::with_service_name("brand-scraper"),
//! )?;
//!
//! let charge = client.debit("user-123", "brand_scraper", "job-42").await?;
//!
//! // ... run the tool ...
//!
//! client.mark_succeeded(&charge.usage_id.to_string(), Some("job-42")).await?;
//! println!("Balance left: {} credits", charge.balance_after);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::{ClientOptions, ToolCreditsClient};
pub use error::ClientError;
pub use types::*;
