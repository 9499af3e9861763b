//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, health, pricing, purchases, usage};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for usage endpoints.
const USAGE_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Service (API key auth)
/// - `POST /v1/accounts/ensure` - Get or create an account
/// - `POST /v1/usage/debit` - Charge for a tool use
/// - `POST /v1/usage/:usage_id/succeeded` - Report success
/// - `POST /v1/usage/:usage_id/failed` - Report failure
/// - `POST /v1/usage/:usage_id/refund` - Refund a charge
/// - `GET /v1/usage/:usage_id` - Get a usage record
/// - `GET /v1/pricing` - Active catalog
/// - `POST /v1/purchases` - Apply a verified payment
///
/// ## Admin (admin key auth)
/// - `GET /v1/admin/accounts/:user_id` - Get an account
/// - `POST /v1/admin/accounts/:user_id/adjust` - Adjust a balance
/// - `GET /v1/admin/accounts/:user_id/ledger` - Ledger entries
/// - `GET /v1/admin/accounts/:user_id/usage` - Usage records
/// - `GET /v1/admin/accounts/:user_id/purchases` - Purchases
/// - `GET /v1/admin/accounts/:user_id/reconcile` - Balance vs ledger
/// - `GET /v1/admin/pricing` - Full catalog
/// - `PUT /v1/admin/pricing/:tool_key` - Update a tool's pricing
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Metered tools call these on every invocation.
    let usage_routes = Router::new()
        .route("/debit", post(usage::debit))
        .route("/:usage_id", get(usage::get_usage))
        .route("/:usage_id/succeeded", post(usage::mark_succeeded))
        .route("/:usage_id/failed", post(usage::mark_failed))
        .route("/:usage_id/refund", post(usage::refund))
        .layer(ConcurrencyLimitLayer::new(USAGE_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route("/accounts/:user_id", get(admin::get_account))
        .route("/accounts/:user_id/adjust", post(admin::adjust_balance))
        .route("/accounts/:user_id/ledger", get(admin::list_ledger))
        .route("/accounts/:user_id/usage", get(admin::list_usage))
        .route("/accounts/:user_id/purchases", get(admin::list_purchases))
        .route("/accounts/:user_id/reconcile", get(admin::reconcile))
        .route("/pricing", get(pricing::all_pricing))
        .route("/pricing/:tool_key", put(pricing::update_pricing));

    let api_routes = Router::new()
        .route("/accounts/ensure", post(accounts::ensure_account))
        .route("/pricing", get(pricing::active_pricing))
        .route("/purchases", post(purchases::apply_purchase))
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        // Usage routes carry their own concurrency limit
        .nest("/usage", usage_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
