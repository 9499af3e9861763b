//! API handlers.

pub mod accounts;
pub mod admin;
pub mod health;
pub mod pricing;
pub mod purchases;
pub mod usage;

use serde::Deserialize;

/// Query parameters shared by listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Maximum number of items (default 50, at most 200).
    pub limit: Option<usize>,
}
