//! HTTP server for the tournament points ledger.
//!
//! The binary wires configuration, logging, metrics and a PostgreSQL-backed
//! [`tourney_ledger::settlement::SettlementManager`] into the axum router
//! defined in [`api`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
