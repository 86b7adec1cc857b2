//! Balance, history and redemption integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

fn redeem_body(coins: i64, bill_amount: i64) -> serde_json::Value {
    json!({
        "brand_id": uuid::Uuid::new_v4().to_string(),
        "bill_amount": bill_amount,
        "coins": coins,
        "brand_rates": {
            "earn_percent": 10,
            "redeem_percent": 50,
            "min_redemption": 10,
            "max_redemption": 1000,
        },
    })
}

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn unregistered_user_reads_zero_balance() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/coins/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 0);
    assert_eq!(body["total_earned"], 0);
}

#[tokio::test]
async fn balance_requires_auth() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/coins/balance").await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Redemption
// ============================================================================

#[tokio::test]
async fn redeem_creates_pending_transaction_without_moving_coins() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&redeem_body(50, 200))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["transaction_type"], "redeem");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["coins_redeemed"], 50);

    // Coins move only on approval
    assert_eq!(harness.balance().await, 100);
}

#[tokio::test]
async fn redeem_more_than_balance_fails() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&redeem_body(500, 2000))
        .await;

    assert_eq!(response.status_code(), 422);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_balance");
    assert_eq!(body["error"]["details"]["balance"], 100);
    assert_eq!(body["error"]["details"]["required"], 500);
}

#[tokio::test]
async fn redeem_below_brand_minimum_fails() {
    let harness = TestHarness::new();
    harness.register_account().await;

    // min_redemption is 10
    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&redeem_body(5, 200))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn redeem_over_bill_percentage_cap_fails() {
    let harness = TestHarness::new();
    harness.register_account().await;

    // redeem_percent is 50: at most 50 coins against a 100 bill
    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&redeem_body(80, 100))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn redeem_against_oversized_bill_fails() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&redeem_body(50, i64::MAX / 2))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn redeem_without_account_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/coins/redeem")
        .add_header("authorization", harness.user_auth_header())
        .json(&redeem_body(50, 200))
        .await;

    response.assert_status_not_found();
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn transaction_history_is_newest_first_and_scoped_to_user() {
    let harness = TestHarness::new();
    harness.register_account().await;
    // Transaction IDs order by creation millisecond; keep the two writes
    // in distinct ones so the ordering assertion is deterministic.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    harness.stage_and_claim(500, 10).await;

    let response = harness
        .server
        .get("/v1/coins/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().expect("array");
    assert_eq!(transactions.len(), 2);
    // Newest first: the EARN claim, then the welcome bonus
    assert_eq!(transactions[0]["transaction_type"], "earn");
    assert_eq!(transactions[1]["transaction_type"], "welcome_bonus");

    // Another user sees none of it
    let response = harness
        .server
        .get("/v1/coins/transactions")
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn transaction_history_filters_by_status_and_type() {
    let harness = TestHarness::new();
    harness.register_account().await;
    harness.stage_and_claim(500, 10).await;

    let response = harness
        .server
        .get("/v1/coins/transactions?status=pending")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().expect("array");
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["status"], "pending");

    let response = harness
        .server
        .get("/v1/coins/transactions?type=welcome_bonus")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().expect("array");
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_type"], "welcome_bonus");
}

#[tokio::test]
async fn transaction_history_rejects_unknown_status() {
    let harness = TestHarness::new();
    harness.register_account().await;

    let response = harness
        .server
        .get("/v1/coins/transactions?status=bogus")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_bad_request();
}
