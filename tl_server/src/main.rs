//! Tournament points ledger server.
//!
//! Serves the ledger HTTP API over a PostgreSQL-backed store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Error, anyhow};
use log::info;
use pico_args::Arguments;
use tl_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use tourney_ledger::{db::Database, settlement::SettlementManager};

const HELP: &str = "\
Run the tournament points ledger server

USAGE:
  tl_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string (required)
  DB_MAX_CONNECTIONS       Pool size [default: 20]
  DB_MIN_CONNECTIONS       Idle pool floor [default: 1]
  DB_CONNECTION_TIMEOUT_SECS
                           Pool acquire timeout [default: 5]
  DB_IDLE_TIMEOUT_SECS     Idle connection timeout [default: 300]
  DB_MAX_LIFETIME_SECS     Connection lifetime [default: 1800]
  DB_LOCK_TIMEOUT_MS       Row lock wait limit per transaction [default: 5000]
  METRICS_BIND             Prometheus listener address [default: disabled]
  ALLOW_RESET              Honor POST /api/v1/admin/reset [default: true]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, database_url_override)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics listening on {}", metrics_bind);
    }

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;
    db.migrate()
        .await
        .map_err(|e| anyhow!("Failed to create schema: {}", e))?;
    info!(
        "Database ready (lock timeout {} ms)",
        config.database.lock_timeout_ms
    );

    let settlement = SettlementManager::new(Arc::new(db.store()));
    let app = api::create_router(AppState::new(settlement, config.allow_reset));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
