//! HTTP API for the tournament points ledger.
//!
//! A thin adapter: handlers parse and validate requests, call the
//! [`SettlementManager`], and map its results to status codes. All
//! consistency rules live in the ledger library.
//!
//! # Modules
//!
//! - [`players`]: Funding, debiting and balance lookup
//! - [`tournaments`]: Announce, join, result, and lookups
//! - [`request_id`]: Request correlation middleware
//! - [`error`]: JSON error bodies and status mapping
//!
//! # Status Codes
//!
//! - `204 No Content`: Workflow committed
//! - `400 Bad Request`: Malformed request, `{"error": "..."}`
//! - `404 Not Found`: Unknown player, tournament or entry on reads
//! - `409 Conflict`: Ledger rule violated, `{"error": reason, "message": "..."}`
//! - `500 Internal Server Error`: Store failure, `{"error": "Internal server error"}`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tl_server::api::{AppState, create_router};
//! use tourney_ledger::{db::MemoryStore, settlement::SettlementManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settlement = SettlementManager::new(Arc::new(MemoryStore::new()));
//! let app = create_router(AppState::new(settlement, true));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod error;
pub mod players;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use tourney_ledger::{db::LedgerStore, settlement::SettlementManager};
use tower_http::cors::CorsLayer;

use error::{ApiError, error_response, settlement_error};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the manager only holds an `Arc` to the store.
pub struct AppState<S> {
    pub settlement: SettlementManager<S>,
    pub allow_reset: bool,
}

impl<S> AppState<S> {
    pub fn new(settlement: SettlementManager<S>, allow_reset: bool) -> Self {
        Self {
            settlement,
            allow_reset,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            settlement: self.settlement.clone(),
            allow_reset: self.allow_reset,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                                           - Health check
/// POST /api/v1/players/{player_id}/fund                  - Credit points
/// POST /api/v1/players/{player_id}/take                  - Debit points
/// GET  /api/v1/players/{player_id}                       - Get balance
/// POST /api/v1/tournaments                               - Announce tournament
/// GET  /api/v1/tournaments/{tournament_id}               - Get tournament
/// POST /api/v1/tournaments/{tournament_id}/join          - Join with backers
/// GET  /api/v1/tournaments/{tournament_id}/entries/{id}  - Get entry
/// POST /api/v1/tournaments/{tournament_id}/result        - Result and pay out
/// POST /api/v1/admin/reset                               - Reset all data
/// ```
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_check::<S>))
        .nest("/api/v1", create_v1_router::<S>())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router<S: LedgerStore>() -> Router<AppState<S>> {
    let player_routes = Router::new()
        .route("/players/{player_id}", get(players::get_player::<S>))
        .route("/players/{player_id}/fund", post(players::fund::<S>))
        .route("/players/{player_id}/take", post(players::take::<S>));

    let tournament_routes = Router::new()
        .route("/tournaments", post(tournaments::announce::<S>))
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/join",
            post(tournaments::join::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/entries/{player_id}",
            get(tournaments::get_entry::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/result",
            post(tournaments::result::<S>),
        );

    Router::new()
        .merge(player_routes)
        .merge(tournament_routes)
        .route("/admin/reset", post(reset::<S>))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","database":true,"timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check<S: LedgerStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let db_healthy = state.settlement.store().health_check().await.is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

/// Drop and recreate all ledger data.
///
/// # Errors
///
/// - `403 Forbidden`: Resets are disabled (`ALLOW_RESET=false`)
async fn reset<S: LedgerStore>(State(state): State<AppState<S>>) -> Result<StatusCode, ApiError> {
    if !state.allow_reset {
        return Err(error_response(StatusCode::FORBIDDEN, "Resets are disabled"));
    }

    state.settlement.reset().await.map_err(settlement_error)?;
    Ok(StatusCode::NO_CONTENT)
}
