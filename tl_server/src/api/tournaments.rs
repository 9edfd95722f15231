//! Tournament API handlers.
//!
//! - `POST /api/v1/tournaments` announces a tournament
//! - `GET /api/v1/tournaments/{tournament_id}` reads it
//! - `POST /api/v1/tournaments/{tournament_id}/join` enters a player with backers
//! - `GET /api/v1/tournaments/{tournament_id}/entries/{player_id}` reads an entry
//! - `POST /api/v1/tournaments/{tournament_id}/result` finishes it and pays prizes
//!
//! # Examples
//!
//! Join with two backers:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/join \
//!   -H "Content-Type: application/json" \
//!   -d '{"playerId": "P1", "backerIds": ["P2", "P3"]}'
//! ```
//!
//! Result:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"winners": [{"playerId": "P1", "prize": 2000}]}'
//! ```

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use std::time::Instant;
use tourney_ledger::{
    db::LedgerStore,
    ledger::PlayerId,
    tournament::{Entry, Tournament, TournamentId},
};

use super::AppState;
use super::error::{ApiError, bad_request, json_rejection, not_found, settlement_error};
use super::players::validate_player_id;
use crate::metrics::record_workflow;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceRequest {
    pub tournament_id: TournamentId,
    pub deposit: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub player_id: PlayerId,
    #[serde(default)]
    pub backer_ids: Vec<PlayerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRequest {
    pub player_id: PlayerId,
    pub prize: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRequest {
    pub winners: Vec<WinnerRequest>,
}

/// Collect winners keyed by player ID, rejecting repeats
fn collect_winners(winners: Vec<WinnerRequest>) -> Result<BTreeMap<PlayerId, i64>, ApiError> {
    let mut prizes = BTreeMap::new();
    for winner in winners {
        validate_player_id(&winner.player_id)?;
        match prizes.entry(winner.player_id) {
            MapEntry::Vacant(slot) => {
                slot.insert(winner.prize);
            }
            MapEntry::Occupied(slot) => {
                return Err(bad_request(format!(
                    "Winner {} is listed more than once",
                    slot.key()
                )));
            }
        }
    }
    Ok(prizes)
}

/// Announce a tournament.
///
/// # Request Body
///
/// ```json
/// {"tournamentId": 1, "deposit": 1000}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body
/// - `409 Conflict`: `invalid_deposit`, `duplicate_tournament`
pub async fn announce<S: LedgerStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<AnnounceRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;

    let started = Instant::now();
    let result = state
        .settlement
        .announce_tournament(request.tournament_id, request.deposit)
        .await;
    record_workflow("announce", &result, started);

    result.map(|_| StatusCode::NO_CONTENT).map_err(settlement_error)
}

/// Get a tournament.
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament
pub async fn get_tournament<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    state
        .settlement
        .tournament(tournament_id)
        .await
        .map_err(settlement_error)?
        .map(Json)
        .ok_or_else(|| not_found(format!("Tournament {} not found", tournament_id)))
}

/// Enter a player, optionally backed by other players.
///
/// The deposit is split across the player and backers, primary player first.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or player IDs
/// - `409 Conflict`: `tournament_not_found`, `tournament_finished`,
///   `duplicate_entry`, `duplicate_backers`, `too_many_backers`,
///   `player_not_found`, `negative_balance`
pub async fn join<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    validate_player_id(&request.player_id)?;
    for backer_id in &request.backer_ids {
        validate_player_id(backer_id)?;
    }

    let started = Instant::now();
    let result = state
        .settlement
        .join_tournament(tournament_id, &request.player_id, &request.backer_ids)
        .await;
    record_workflow("join", &result, started);

    result.map(|_| StatusCode::NO_CONTENT).map_err(settlement_error)
}

/// Get a player's entry in a tournament.
///
/// # Errors
///
/// - `404 Not Found`: No such entry
pub async fn get_entry<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((tournament_id, player_id)): Path<(TournamentId, PlayerId)>,
) -> Result<Json<Entry>, ApiError> {
    state
        .settlement
        .entry(tournament_id, &player_id)
        .await
        .map_err(settlement_error)?
        .map(Json)
        .ok_or_else(|| {
            not_found(format!(
                "Entry for {} in tournament {} not found",
                player_id, tournament_id
            ))
        })
}

/// Finish a tournament and pay each winning entry's prize to its backers.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or repeated winner
/// - `409 Conflict`: `tournament_not_found`, `already_finished`,
///   `entry_not_found`, `invalid_prize`
pub async fn result<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<ResultRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    let winners = collect_winners(request.winners)?;

    let started = Instant::now();
    let result = state
        .settlement
        .result_tournament(tournament_id, winners)
        .await;
    record_workflow("result", &result, started);

    result.map(|_| StatusCode::NO_CONTENT).map_err(settlement_error)
}
