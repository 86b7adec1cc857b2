//! Admin verification and reconciliation integration tests.

mod common;

use common::{TestHarness, TEST_ADMIN_KEY};
use serde_json::json;

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn admin_endpoints_require_key() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/admin/transactions").await;
    response.assert_status_unauthorized();

    let response = harness
        .server
        .get("/v1/admin/transactions")
        .add_header("x-admin-key", "wrong-key")
        .await;
    response.assert_status_unauthorized();

    // A user JWT is not an admin credential
    let response = harness
        .server
        .get("/v1/admin/stats")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_unauthorized();
}

// ============================================================================
// Approval
// ============================================================================

#[tokio::test]
async fn approving_earn_credits_coins() {
    let harness = TestHarness::new();
    harness.register_account().await;
    let tx_id = harness.stage_and_claim(500, 10).await;

    let body = harness.approve(&tx_id).await;
    assert_eq!(body["applied"], true);
    assert_eq!(body["new_balance"], 150);
    assert_eq!(body["transaction"]["status"], "approved");
    assert_eq!(body["transaction"]["balance_after_earn"], 150);

    assert_eq!(harness.balance().await, 150);
}

#[tokio::test]
async fn reapproval_is_idempotent() {
    let harness = TestHarness::new();
    harness.register_account().await;
    let tx_id = harness.stage_and_claim(500, 10).await;

    let first = harness.approve(&tx_id).await;
    assert_eq!(first["applied"], true);

    let second = harness.approve(&tx_id).await;
    assert_eq!(second["applied"], false);
    assert_eq!(second["transaction"]["status"], "approved");

    // Credited exactly once
    assert_eq!(harness.balance().await, 150);
}

#[tokio::test]
async fn approving_redeem_debits_coins() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "brand_id": uuid::Uuid::new_v4().to_string(),
            "bill_amount": 200,
            "coins": 50,
            "brand_rates": {
                "earn_percent": 10,
                "redeem_percent": 50,
                "min_redemption": 10,
                "max_redemption": 1000,
            },
        }))
        .await;
    response.assert_status_ok();
    let tx: serde_json::Value = response.json();
    let tx_id = tx["id"].as_str().expect("id").to_string();

    let body = harness.approve(&tx_id).await;
    assert_eq!(body["applied"], true);
    assert_eq!(body["new_balance"], 50);
    assert_eq!(body["transaction"]["balance_after_redeem"], 50);

    assert_eq!(harness.balance().await, 50);
}

#[tokio::test]
async fn approving_settled_transaction_conflicts() {
    let harness = TestHarness::new();
    harness.register_account().await;
    let tx_id = harness.stage_and_claim(500, 10).await;

    // Reject it first
    harness
        .server
        .post(&format!("/v1/admin/transactions/{tx_id}/reject"))
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .json(&json!({ "note": "unreadable receipt" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/admin/transactions/{tx_id}/approve"))
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .await;

    assert_eq!(response.status_code(), 409);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_state_transition");
}

// ============================================================================
// Rejection and reversal
// ============================================================================

#[tokio::test]
async fn rejecting_pending_never_touches_ledger() {
    let harness = TestHarness::new();
    harness.register_account().await;
    let tx_id = harness.stage_and_claim(500, 10).await;

    let response = harness
        .server
        .post(&format!("/v1/admin/transactions/{tx_id}/reject"))
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .json(&json!({ "note": "bill amount mismatch" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["reversed"], false);
    assert_eq!(body["transaction"]["status"], "rejected");
    assert_eq!(body["transaction"]["admin_notes"], "bill amount mismatch");

    assert_eq!(harness.balance().await, 100);
}

#[tokio::test]
async fn rejection_requires_a_note() {
    let harness = TestHarness::new();
    harness.register_account().await;
    let tx_id = harness.stage_and_claim(500, 10).await;

    let response = harness
        .server
        .post(&format!("/v1/admin/transactions/{tx_id}/reject"))
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .json(&json!({ "note": "  " }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn rejecting_approved_earn_reverses_the_credit() {
    let harness = TestHarness::new();
    harness.register_account().await;
    let tx_id = harness.stage_and_claim(500, 10).await;

    harness.approve(&tx_id).await;
    assert_eq!(harness.balance().await, 150);

    let response = harness
        .server
        .post(&format!("/v1/admin/transactions/{tx_id}/reject"))
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .json(&json!({ "note": "receipt was forged" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["reversed"], true);
    assert_eq!(body["new_balance"], 100);
    assert_eq!(body["transaction"]["status"], "rejected");

    assert_eq!(harness.balance().await, 100);
}

// ============================================================================
// Admin listing
// ============================================================================

#[tokio::test]
async fn admin_can_list_pending_queue_across_users() {
    let harness = TestHarness::new();
    harness.register_account().await;
    harness.stage_and_claim(500, 10).await;

    let response = harness
        .server
        .get("/v1/admin/transactions?status=pending")
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().expect("array");
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["status"], "pending");
    assert_eq!(transactions[0]["transaction_type"], "earn");
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn stats_reflect_ledger_activity() {
    let harness = TestHarness::new();
    harness.register_account().await;
    harness.stage_and_claim(500, 10).await;

    let response = harness
        .server
        .get("/v1/admin/stats")
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_users"], 1);
    assert_eq!(body["welcome_bonuses_given"], 1);
    assert_eq!(body["total_coins_in_circulation"], 100);
    assert_eq!(body["pending_earn_requests"], 1);
    assert_eq!(body["pending_redemptions"], 0);
}

// ============================================================================
// Adjustments
// ============================================================================

#[tokio::test]
async fn adjustment_settles_immediately() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .post("/v1/admin/adjustments")
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "coins": -30,
            "reason": "support correction",
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["new_balance"], 70);
    assert_eq!(body["transaction"]["transaction_type"], "adjustment");
    assert_eq!(body["transaction"]["status"], "processed");

    assert_eq!(harness.balance().await, 70);
}

#[tokio::test]
async fn negative_adjustment_cannot_overdraw() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .post("/v1/admin/adjustments")
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "coins": -500,
            "reason": "support correction",
        }))
        .await;

    assert_eq!(response.status_code(), 422);
    assert_eq!(harness.balance().await, 100);
}

// ============================================================================
// Purge
// ============================================================================

#[tokio::test]
async fn purge_removes_claimed_rows_only() {
    let harness = TestHarness::new();
    harness.register_account().await;

    // One claimed, one still waiting
    harness.stage_and_claim(500, 10).await;
    harness.stage_receipt(300, 5).await;

    let response = harness
        .server
        .post("/v1/admin/receipts/purge")
        .add_header("x-admin-key", TEST_ADMIN_KEY)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["purged"], 1);
}
