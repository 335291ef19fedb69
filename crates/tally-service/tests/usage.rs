//! Consumption and usage rate integration tests.

mod common;

use common::{TestHarness, TEST_API_KEY};
use serde_json::json;
use tally_core::OrgId;
use tally_engine::ExemptionSet;

fn consume_body(org_id: OrgId, request_id: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "org_id": org_id.to_string(),
        "feature_type": "post_generation",
        "quantity": 1
    });
    if let Some(request_id) = request_id {
        body["request_id"] = json!(request_id);
    }
    body
}

#[tokio::test]
async fn consume_debits_at_the_configured_rate() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 100).await;

    let response = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&consume_body(org_id, None))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits_consumed"], 2);
    assert_eq!(body["balance_after"], 98);
    assert_eq!(body["unlimited"], false);
    assert!(body["entry_id"].is_string());
}

#[tokio::test]
async fn replay_with_same_request_id_does_not_redebit() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 100).await;

    let first = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&consume_body(org_id, Some("req-1")))
        .await;
    first.assert_status_ok();
    let first: serde_json::Value = first.json();

    let replay = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&consume_body(org_id, Some("req-1")))
        .await;
    replay.assert_status_ok();
    let replay: serde_json::Value = replay.json();

    assert_eq!(first, replay);

    // Balance unchanged, and history holds exactly one debit.
    let history = harness
        .server
        .get(&format!("/v1/orgs/{org_id}/history"))
        .add_header("x-api-key", TEST_API_KEY)
        .await;
    let history: serde_json::Value = history.json();
    assert_eq!(history["total_count"], 2);
}

#[tokio::test]
async fn insufficient_credits_is_payment_required() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 1).await;

    let response = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&consume_body(org_id, None))
        .await;

    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["balance"], 1);
    assert_eq!(body["error"]["details"]["required"], 2);
}

#[tokio::test]
async fn unknown_feature_is_rejected() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 100).await;

    let response = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&json!({
            "org_id": org_id.to_string(),
            "feature_type": "teleportation",
            "quantity": 1
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unknown_feature");
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;

    let response = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&json!({
            "org_id": org_id.to_string(),
            "feature_type": "post_generation",
            "quantity": 0
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn exempt_org_reports_unlimited_and_writes_nothing() {
    let exempt_org = OrgId::generate();
    let harness = TestHarness::with_exemptions([exempt_org].into_iter().collect::<ExemptionSet>());

    let response = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&consume_body(exempt_org, Some("req-1")))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits_consumed"], 0);
    assert_eq!(body["unlimited"], true);
    assert!(body["entry_id"].is_null());
    assert!(body["balance_after"].is_null());

    let balance = harness
        .server
        .get(&format!("/v1/orgs/{exempt_org}/balance"))
        .add_header("x-api-key", TEST_API_KEY)
        .await;
    balance.assert_status_ok();
    let balance: serde_json::Value = balance.json();
    assert_eq!(balance["unlimited"], true);
    assert!(balance["balance"].is_null());
}

#[tokio::test]
async fn rates_listing_and_admin_update() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/rates")
        .add_header("x-api-key", TEST_API_KEY)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let rates = body["rates"].as_array().unwrap();
    assert!(rates
        .iter()
        .any(|r| r["feature_type"] == "post_generation" && r["credits_per_use"] == 2));

    // Raise the rate; future consumptions use it.
    harness
        .server
        .put("/v1/rates/post_generation")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&json!({ "credits_per_use": 7 }))
        .await
        .assert_status_ok();

    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 100).await;

    let response = harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&consume_body(org_id, None))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits_consumed"], 7);
    assert_eq!(body["balance_after"], 93);
}
