//! Balance, grant, and history integration tests.

mod common;

use common::{TestHarness, TEST_API_KEY};
use serde_json::json;

#[tokio::test]
async fn new_org_has_zero_balance() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;

    let response = harness
        .server
        .get(&format!("/v1/orgs/{org_id}/balance"))
        .add_header("x-api-key", TEST_API_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 0);
    assert_eq!(body["unlimited"], false);
}

#[tokio::test]
async fn balance_of_unknown_org_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!(
            "/v1/orgs/{}/balance",
            tally_core::OrgId::generate()
        ))
        .add_header("x-api-key", TEST_API_KEY)
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn grant_increases_balance() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;

    let response = harness
        .server
        .post("/v1/grants")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&json!({
            "org_id": org_id.to_string(),
            "amount": 100,
            "source": "welcome_bonus",
            "description": "Welcome bonus"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance_after"], 100);
    assert!(body["entry_id"].is_string());
}

#[tokio::test]
async fn grant_rejects_non_positive_amount() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;

    let response = harness
        .server
        .post("/v1/grants")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&json!({
            "org_id": org_id.to_string(),
            "amount": 0,
            "source": "admin_grant",
            "description": "nothing"
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn history_reflects_grants_and_consumptions() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 100).await;

    // ULIDs order the history; space the writes out so the ordering
    // assertions are deterministic.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    harness
        .server
        .post("/v1/consume")
        .add_header("x-api-key", TEST_API_KEY)
        .json(&json!({
            "org_id": org_id.to_string(),
            "feature_type": "post_generation",
            "quantity": 1
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/orgs/{org_id}/history"))
        .add_header("x-api-key", TEST_API_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["has_more"], false);

    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // Newest first: the debit, then the grant.
    assert_eq!(entries[0]["kind"], "debit");
    assert_eq!(entries[0]["credits"], 2);
    assert_eq!(entries[0]["balance_after"], 98);
    assert_eq!(entries[1]["kind"], "credit");
    assert_eq!(entries[1]["credits"], 100);
}

#[tokio::test]
async fn history_pagination() {
    let harness = TestHarness::new();
    let org_id = harness.create_org("Acme").await;
    harness.grant(org_id, 10).await;
    harness.grant(org_id, 20).await;
    harness.grant(org_id, 30).await;

    let response = harness
        .server
        .get(&format!("/v1/orgs/{org_id}/history?limit=2&offset=0"))
        .add_header("x-api-key", TEST_API_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["has_more"], true);

    let response = harness
        .server
        .get(&format!("/v1/orgs/{org_id}/history?limit=2&offset=2"))
        .add_header("x-api-key", TEST_API_KEY)
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);
}
