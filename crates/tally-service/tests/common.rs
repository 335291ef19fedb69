//! Common test utilities for tally integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use tally_core::OrgId;
use tally_engine::ExemptionSet;
use tally_service::{create_router, AppState, ServiceConfig};
use tally_store::RocksStore;

/// The API key every test request presents.
pub const TEST_API_KEY: &str = "test-service-key";

/// The webhook signing secret used by the harness.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a harness with a fresh database and no exemptions.
    pub fn new() -> Self {
        Self::with_exemptions(ExemptionSet::empty())
    }

    /// Create a harness with a configured exemption set.
    pub fn with_exemptions(exemptions: ExemptionSet) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(TEST_API_KEY.to_string()),
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store, exemptions, config);
        state
            .ledger
            .seed_default_rates()
            .expect("Failed to seed rates");
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
        }
    }

    /// Create an organization and return its id.
    pub async fn create_org(&self, name: &str) -> OrgId {
        let response = self
            .server
            .post("/v1/orgs")
            .add_header("x-api-key", TEST_API_KEY)
            .json(&serde_json::json!({ "name": name }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["org_id"].as_str().unwrap().parse().unwrap()
    }

    /// Grant credits to an organization.
    pub async fn grant(&self, org_id: OrgId, amount: i64) {
        self.server
            .post("/v1/grants")
            .add_header("x-api-key", TEST_API_KEY)
            .json(&serde_json::json!({
                "org_id": org_id.to_string(),
                "amount": amount,
                "source": "welcome_bonus",
                "description": "Welcome bonus"
            }))
            .await
            .assert_status_ok();
    }

    /// Deliver a signed payment webhook and return the response body.
    pub async fn webhook(&self, event: &serde_json::Value) -> serde_json::Value {
        let body = event.to_string();
        let signature = tally_service::crypto::hmac_sha256_hex(TEST_WEBHOOK_SECRET, &body);

        let response = self
            .server
            .post("/webhooks/payments")
            .add_header("x-tally-signature", signature)
            .text(body)
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
