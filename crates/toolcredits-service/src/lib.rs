//! Toolcredits HTTP API Service.
//!
//! This crate exposes the credit ledger over HTTP:
//!
//! - Account creation with the signup grant
//! - Tool-use debits, completion reports and refunds
//! - Purchase application for the payment collaborator
//! - Operator listings, reconciliation, adjustments and pricing
//!
//! # Authentication
//!
//! Two API keys guard the surface:
//!
//! 1. **Service key** (`x-api-key`) - metered tools and the payment collaborator
//! 2. **Admin key** (`x-admin-key`) - operator endpoints under `/v1/admin`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers call the synchronous engine

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServiceConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
