//! Common test utilities for toolcredits integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use toolcredits_core::default_catalog;
use toolcredits_service::{create_router, AppState, ServiceConfig};
use toolcredits_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// The service API key for tool and payment requests.
    pub service_api_key: String,
    /// The admin API key for operator requests.
    pub admin_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and the default
    /// pricing catalog.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();
        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            admin_api_key: Some(admin_api_key.clone()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(Arc::new(store), config).expect("Failed to build app state");
        state
            .engine
            .seed_pricing(&default_catalog())
            .expect("Failed to seed pricing");
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            service_api_key,
            admin_api_key,
        }
    }

    /// Charge `user_id` for one use of `tool_key`.
    pub async fn debit(&self, user_id: &str, tool_key: &str, key: &str) -> TestResponse {
        self.server
            .post("/v1/usage/debit")
            .add_header("x-api-key", &self.service_api_key)
            .add_header("x-service-name", "test-tool")
            .json(&json!({
                "user_id": user_id,
                "email": format!("{user_id}@example.com"),
                "tool_key": tool_key,
                "idempotency_key": key
            }))
            .await
    }

    /// Post a lifecycle report for a usage record.
    pub async fn report(&self, usage_id: &str, action: &str, body: Value) -> TestResponse {
        self.server
            .post(&format!("/v1/usage/{usage_id}/{action}"))
            .add_header("x-api-key", &self.service_api_key)
            .json(&body)
            .await
    }

    /// Fetch an admin resource.
    pub async fn admin_get(&self, path: &str) -> TestResponse {
        self.server
            .get(path)
            .add_header("x-admin-key", &self.admin_api_key)
            .add_header("x-admin-id", "ops-test")
            .await
    }

    /// Current balance as seen by the operator surface.
    pub async fn balance(&self, user_id: &str) -> i64 {
        let response = self.admin_get(&format!("/v1/admin/accounts/{user_id}")).await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["balance_credits"].as_i64().expect("balance missing")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
