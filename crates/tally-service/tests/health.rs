//! Health endpoint integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn v1_requires_api_key() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/rates").await;
    response.assert_status_unauthorized();

    let response = harness
        .server
        .get("/v1/rates")
        .add_header("x-api-key", "wrong-key")
        .await;
    response.assert_status_unauthorized();
}
