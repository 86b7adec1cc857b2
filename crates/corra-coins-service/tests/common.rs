//! Common test utilities for corra-coins integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use corra_coins_core::UserId;
use corra_coins_service::{create_router, AppState, ServiceConfig};
use corra_coins_store::RocksStore;

/// The admin key used by all test harnesses.
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// The payout webhook secret used by harnesses that enable it.
pub const TEST_PAYOUT_SECRET: &str = "test-payout-secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    ///
    /// Webhook signature verification is disabled; use
    /// [`TestHarness::with_payout_secret`] to exercise it.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a harness with payout webhook signature verification enabled.
    pub fn with_payout_secret() -> Self {
        Self::build(Some(TEST_PAYOUT_SECRET.to_string()))
    }

    fn build(payout_webhook_secret: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_base_url: "http://localhost".into(),
            auth_audience: "corra-coins".into(),
            admin_api_key: Some(TEST_ADMIN_KEY.to_string()),
            payout_webhook_secret,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            welcome_bonus_coins: 100,
            receipt_ttl_minutes: 60,
            purge_interval_seconds: 3600,
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        let other_user = UserId::generate();
        format!("Bearer test-token:{other_user}")
    }

    /// Register the test user's account (grants the welcome bonus).
    pub async fn register_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.user_auth_header())
            .await
            .assert_status_ok();
    }

    /// Stage a receipt for a fresh anonymous session; returns the receipt ID.
    pub async fn stage_receipt(&self, bill_amount: i64, earn_percent: u8) -> String {
        let response = self
            .server
            .post("/v1/receipts")
            .json(&serde_json::json!({
                "session_id": uuid::Uuid::new_v4().to_string(),
                "brand_id": uuid::Uuid::new_v4().to_string(),
                "bill_amount": bill_amount,
                "receipt_url": "https://cdn.example.com/receipts/1.jpg",
                "earn_percent": earn_percent,
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["id"].as_str().expect("receipt id").to_string()
    }

    /// Stage and claim a receipt for the test user; returns the pending
    /// EARN transaction ID.
    pub async fn stage_and_claim(&self, bill_amount: i64, earn_percent: u8) -> String {
        let receipt_id = self.stage_receipt(bill_amount, earn_percent).await;
        let response = self
            .server
            .post(&format!("/v1/receipts/{receipt_id}/claim"))
            .add_header("authorization", self.user_auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["id"].as_str().expect("transaction id").to_string()
    }

    /// Approve a transaction as admin; returns the response body.
    pub async fn approve(&self, transaction_id: &str) -> serde_json::Value {
        let response = self
            .server
            .post(&format!("/v1/admin/transactions/{transaction_id}/approve"))
            .add_header("x-admin-key", TEST_ADMIN_KEY)
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Fetch the test user's balance.
    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/v1/coins/balance")
            .add_header("authorization", self.user_auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["balance"].as_i64().expect("balance")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
