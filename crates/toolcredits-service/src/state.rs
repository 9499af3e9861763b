//! Application state.

use std::sync::Arc;

use toolcredits_engine::CreditEngine;
use toolcredits_store::RocksStore;

use crate::config::{ConfigError, ServiceConfig};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credit ledger engine.
    pub engine: CreditEngine<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration yields invalid engine settings.
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Result<Self, ConfigError> {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - service endpoints will reject all requests");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not set - admin endpoints will reject all requests");
        }

        let engine = CreditEngine::with_shared_store(store, config.engine_config()?);
        Ok(Self { engine, config })
    }
}
