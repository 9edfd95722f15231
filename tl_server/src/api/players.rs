//! Player balance API handlers.
//!
//! - `POST /api/v1/players/{player_id}/fund` credits points
//! - `POST /api/v1/players/{player_id}/take` debits points
//! - `GET /api/v1/players/{player_id}` reads the committed balance
//!
//! Funding an unknown player creates it with a zero balance first.
//!
//! # Examples
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/players/P1/fund \
//!   -H "Content-Type: application/json" \
//!   -d '{"points": 300}'
//! ```

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use std::time::Instant;
use tourney_ledger::{db::LedgerStore, ledger::Player};

use super::AppState;
use super::error::{ApiError, bad_request, json_rejection, not_found, settlement_error};
use crate::metrics::record_workflow;

/// Longest accepted player ID (matches the `players.player_id` column)
pub const MAX_PLAYER_ID_LEN: usize = 64;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsRequest {
    pub points: i64,
}

/// Reject player IDs the store cannot hold
pub fn validate_player_id(player_id: &str) -> Result<(), ApiError> {
    if player_id.trim().is_empty() {
        return Err(bad_request("Player ID must not be empty"));
    }
    if player_id.len() > MAX_PLAYER_ID_LEN {
        return Err(bad_request(format!(
            "Player ID must be at most {} bytes",
            MAX_PLAYER_ID_LEN
        )));
    }
    Ok(())
}

fn parse_points(payload: Result<Json<PointsRequest>, JsonRejection>) -> Result<i64, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    if request.points < 0 {
        return Err(bad_request("Points must not be negative"));
    }
    Ok(request.points)
}

/// Credit points to a player.
///
/// # Response
///
/// Returns `204 No Content` on success.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or negative points
/// - `409 Conflict`: `balance_overflow`
pub async fn fund<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(player_id): Path<String>,
    payload: Result<Json<PointsRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    validate_player_id(&player_id)?;
    let points = parse_points(payload)?;

    let started = Instant::now();
    let result = state.settlement.fund(&player_id, points).await;
    record_workflow("fund", &result, started);

    result.map(|_| StatusCode::NO_CONTENT).map_err(settlement_error)
}

/// Debit points from a player.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or negative points
/// - `409 Conflict`: `negative_balance` when the balance cannot cover it
pub async fn take<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(player_id): Path<String>,
    payload: Result<Json<PointsRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    validate_player_id(&player_id)?;
    let points = parse_points(payload)?;

    let started = Instant::now();
    let result = state.settlement.take(&player_id, points).await;
    record_workflow("take", &result, started);

    result.map(|_| StatusCode::NO_CONTENT).map_err(settlement_error)
}

/// Get a player's balance.
///
/// # Response
///
/// ```json
/// {"playerId": "P1", "balance": 300}
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Player has never been funded
pub async fn get_player<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(player_id): Path<String>,
) -> Result<Json<Player>, ApiError> {
    state
        .settlement
        .balance(&player_id)
        .await
        .map_err(settlement_error)?
        .map(Json)
        .ok_or_else(|| not_found(format!("Player {} not found", player_id)))
}
