//! Integration tests for the HTTP API.
//!
//! Drives the router directly with `oneshot` over an in-memory store.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tl_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use tourney_ledger::db::MemoryStore;
use tourney_ledger::settlement::SettlementManager;
use tower::ServiceExt; // For `oneshot` method

/// Helper to create test server
fn create_test_server(allow_reset: bool) -> Router {
    let settlement = SettlementManager::new(Arc::new(MemoryStore::new()));
    create_router(AppState::new(settlement, allow_reset))
}

/// Send a request and return status plus parsed JSON body (`Null` when empty)
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

async fn fund(app: &Router, player_id: &str, points: i64) {
    let (status, _) = send(
        app,
        "POST",
        &format!("/api/v1/players/{}/fund", player_id),
        Some(json!({ "points": points })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

async fn balance(app: &Router, player_id: &str) -> i64 {
    let (status, body) = send(app, "GET", &format!("/api/v1/players/{}", player_id), None).await;
    assert_eq!(status, StatusCode::OK);
    body["balance"].as_i64().unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server(true);

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = create_test_server(true);

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-42");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

// ============================================================================
// Player Tests
// ============================================================================

#[tokio::test]
async fn test_fund_take_and_get_player() {
    let app = create_test_server(true);

    fund(&app, "P1", 100).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/players/P1/take",
        Some(json!({ "points": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/api/v1/players/P1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "playerId": "P1", "balance": 80 }));
}

#[tokio::test]
async fn test_overdraw_is_conflict() {
    let app = create_test_server(true);
    fund(&app, "P1", 10).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/players/P1/take",
        Some(json!({ "points": 11 })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "negative_balance");
    assert!(body["message"].is_string());
    assert_eq!(balance(&app, "P1").await, 10);
}

#[tokio::test]
async fn test_invalid_points_are_bad_requests() {
    let app = create_test_server(true);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/players/P1/fund",
        Some(json!({ "points": -5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/players/P1/fund",
        Some(json!({ "amount": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/v1/players/P1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_random_fundings_accumulate() {
    let app = create_test_server(true);

    let mut expected = 0;
    for _ in 0..20 {
        let points: i64 = rand::random_range(0..1000);
        fund(&app, "P1", points).await;
        expected += points;
    }

    assert_eq!(balance(&app, "P1").await, expected);
}

// ============================================================================
// Tournament Tests
// ============================================================================

#[tokio::test]
async fn test_full_use_case_over_http() {
    let app = create_test_server(true);

    for id in ["P1", "P2", "P3"] {
        fund(&app, id, 300).await;
    }
    fund(&app, "P4", 500).await;
    fund(&app, "P5", 1000).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({ "tournamentId": 1, "deposit": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/1/join",
        Some(json!({ "playerId": "P5" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/1/join",
        Some(json!({ "playerId": "P1", "backerIds": ["P2", "P3", "P4"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, entry) = send(&app, "GET", "/api/v1/tournaments/1/entries/P1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["fee"], 1000);
    assert_eq!(entry["backers"][0], json!({ "playerId": "P1", "points": 250 }));

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/1/result",
        Some(json!({ "winners": [{ "playerId": "P1", "prize": 2000 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for (id, expected) in [("P1", 550), ("P2", 550), ("P3", 550), ("P4", 750), ("P5", 0)] {
        assert_eq!(balance(&app, id).await, expected, "balance of {}", id);
    }

    let (status, tournament) = send(&app, "GET", "/api/v1/tournaments/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tournament["state"], "finished");
    assert_eq!(tournament["entryDeposit"], 1000);
}

#[tokio::test]
async fn test_tournament_conflicts() {
    let app = create_test_server(true);
    fund(&app, "P1", 500).await;

    let announce = json!({ "tournamentId": 7, "deposit": 100 });
    let (status, _) = send(&app, "POST", "/api/v1/tournaments", Some(announce.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "POST", "/api/v1/tournaments", Some(announce)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_tournament");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({ "tournamentId": 9, "deposit": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_deposit");

    let join = json!({ "playerId": "P1" });
    let (status, _) = send(&app, "POST", "/api/v1/tournaments/7/join", Some(join.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "POST", "/api/v1/tournaments/7/join", Some(join)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_entry");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments/8/join",
        Some(json!({ "playerId": "P1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "tournament_not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments/7/result",
        Some(json!({ "winners": [{ "playerId": "P2", "prize": 10 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "entry_not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments/7/result",
        Some(json!({ "winners": [{ "playerId": "P1", "prize": -1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_prize");

    let (status, tournament) = send(&app, "GET", "/api/v1/tournaments/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tournament["state"], "open");
}

#[tokio::test]
async fn test_tournament_bad_requests() {
    let app = create_test_server(true);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({ "tournamentId": 1, "deposit": "lots" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/1/result",
        Some(json!({ "winners": [
            { "playerId": "P1", "prize": 10 },
            { "playerId": "P1", "prize": 20 }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/v1/tournaments/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/v1/tournaments/1/entries/P1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Admin Tests
// ============================================================================

#[tokio::test]
async fn test_reset_clears_ledger() {
    let app = create_test_server(true);
    fund(&app, "P1", 100).await;

    let (status, _) = send(&app, "POST", "/api/v1/admin/reset", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/v1/players/P1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_can_be_disabled() {
    let app = create_test_server(false);
    fund(&app, "P1", 100).await;

    let (status, body) = send(&app, "POST", "/api/v1/admin/reset", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());
    assert_eq!(balance(&app, "P1").await, 100);
}
