//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `ServiceAuth` - Tool and payment collaborators via API key
//! - `AdminAuth` - Operator endpoints via admin key

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Read a header as a string, if present and valid UTF-8.
fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Check a presented key against the configured one. A missing
/// configuration rejects every request.
fn check_key(presented: Option<&str>, expected: Option<&String>) -> Result<(), ApiError> {
    match (presented, expected) {
        (Some(presented), Some(expected)) if presented == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Service authentication via API key.
///
/// Used by metered tools and the payment collaborator.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The calling service, from `x-service-name`.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            check_key(
                header(parts, "x-api-key"),
                state.config.service_api_key.as_ref(),
            )?;

            let service_name = header(parts, "x-service-name")
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}

/// Admin authentication via API key with admin scope.
///
/// Requires the `X-Admin-Key` header to match the configured admin key.
/// The `X-Admin-Id` header names the operator in adjustment reasons.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            check_key(
                header(parts, "x-admin-key"),
                state.config.admin_api_key.as_ref(),
            )?;

            let admin_id = header(parts, "x-admin-id")
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .unwrap_or("admin")
                .to_string();

            tracing::debug!(admin_id = %admin_id, "Admin authenticated");

            Ok(AdminAuth { admin_id })
        })
    }
}
