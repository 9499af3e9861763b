//! Metered usage integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

// ============================================================================
// Debit
// ============================================================================

#[tokio::test]
async fn first_debit_creates_account_and_charges() {
    let harness = TestHarness::new();

    let response = harness.debit("alice", "brand_scraper", "k1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["credits_charged"], 50);
    assert_eq!(body["balance_after"], 50);
    assert!(body["usage_id"].as_str().is_some());

    assert_eq!(harness.balance("alice").await, 50);
}

#[tokio::test]
async fn retried_debit_is_not_charged_twice() {
    let harness = TestHarness::new();

    let first: Value = harness.debit("bob", "brand_scraper", "k1").await.json();
    let second: Value = harness.debit("bob", "brand_scraper", "k1").await.json();

    assert_eq!(first, second);
    assert_eq!(harness.balance("bob").await, 50);

    let ledger: Value = harness
        .admin_get("/v1/admin/accounts/bob/ledger")
        .await
        .json();
    assert_eq!(ledger["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn insufficient_credits_returns_payment_required() {
    let harness = TestHarness::new();
    harness.debit("carol", "brand_scraper", "k1").await.assert_status_ok();
    harness.debit("carol", "brand_scraper", "k2").await.assert_status_ok();

    let response = harness.debit("carol", "brand_scraper", "k3").await;

    assert_eq!(response.status_code(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["balance"], 0);
    assert_eq!(body["error"]["details"]["required"], 50);
}

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let harness = TestHarness::new();

    let response = harness.debit("dave", "time_machine", "k1").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unknown_tool");
}

#[tokio::test]
async fn malformed_tool_key_is_bad_request() {
    let harness = TestHarness::new();

    let response = harness.debit("erin", "Not A Key", "k1").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn debit_without_api_key_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/usage/debit")
        .json(&json!({
            "user_id": "frank",
            "tool_key": "ai_chat",
            "idempotency_key": "k1"
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn debit_with_wrong_api_key_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/usage/debit")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({
            "user_id": "frank",
            "tool_key": "ai_chat",
            "idempotency_key": "k1"
        }))
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn success_report_attaches_job_id() {
    let harness = TestHarness::new();
    let debit: Value = harness.debit("gina", "ai_chat", "k1").await.json();
    let usage_id = debit["usage_id"].as_str().unwrap();

    let response = harness
        .report(usage_id, "succeeded", json!({ "external_job_id": "job-7" }))
        .await;

    response.assert_status_ok();
    let record: Value = response.json();
    assert_eq!(record["status"], "succeeded");
    assert_eq!(record["external_job_id"], "job-7");

    let fetched: Value = harness
        .server
        .get(&format!("/v1/usage/{usage_id}"))
        .add_header("x-api-key", &harness.service_api_key)
        .await
        .json();
    assert_eq!(fetched["status"], "succeeded");
}

#[tokio::test]
async fn failed_then_refunded_restores_balance_once() {
    let harness = TestHarness::new();
    let debit: Value = harness.debit("hank", "brand_scraper", "k1").await.json();
    let usage_id = debit["usage_id"].as_str().unwrap();

    harness
        .report(usage_id, "failed", json!({ "reason": "upstream timeout" }))
        .await
        .assert_status_ok();

    let first: Value = harness
        .report(usage_id, "refund", json!({ "reason": "tool failed" }))
        .await
        .json();
    assert_eq!(first["already_refunded"], false);
    assert_eq!(first["balance_after"], 100);
    assert_eq!(first["record"]["status"], "refunded");

    let second: Value = harness
        .report(usage_id, "refund", json!({ "reason": "tool failed" }))
        .await
        .json();
    assert_eq!(second["already_refunded"], true);

    assert_eq!(harness.balance("hank").await, 100);
}

#[tokio::test]
async fn refund_uses_price_at_debit_time() {
    let harness = TestHarness::new();
    let debit: Value = harness.debit("ivy", "brand_scraper", "k1").await.json();
    let usage_id = debit["usage_id"].as_str().unwrap();

    harness
        .server
        .put("/v1/admin/pricing/brand_scraper")
        .add_header("x-admin-key", &harness.admin_api_key)
        .json(&json!({ "credits_per_use": 75, "cost_to_operator_cents_estimate": 12 }))
        .await
        .assert_status_ok();

    let refund: Value = harness.report(usage_id, "refund", json!({})).await.json();

    assert_eq!(refund["balance_after"], 100);
}

#[tokio::test]
async fn unknown_usage_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .report("01ARZ3NDEKTSV4RRFFQ69G5FAV", "succeeded", json!({}))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "usage_not_found");
}

#[tokio::test]
async fn malformed_usage_id_is_bad_request() {
    let harness = TestHarness::new();

    let response = harness.report("not-a-ulid", "refund", json!({})).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Pricing
// ============================================================================

#[tokio::test]
async fn active_pricing_hides_inactive_tools() {
    let harness = TestHarness::new();

    harness
        .server
        .put("/v1/admin/pricing/web_scraper")
        .add_header("x-admin-key", &harness.admin_api_key)
        .json(&json!({ "credits_per_use": 10, "active": false }))
        .await
        .assert_status_ok();

    let active: Value = harness
        .server
        .get("/v1/pricing")
        .add_header("x-api-key", &harness.service_api_key)
        .await
        .json();
    let keys: Vec<&str> = active["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["tool_key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["ai_chat", "brand_scraper", "budget_app"]);

    let response = harness.debit("jack", "web_scraper", "k1").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "tool_inactive");

    let all: Value = harness.admin_get("/v1/admin/pricing").await.json();
    assert_eq!(all["tools"].as_array().unwrap().len(), 4);
}
