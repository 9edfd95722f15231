//! Prometheus metrics for the ledger workflows.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener
//! (`METRICS_BIND`) for scraping by monitoring systems.
//!
//! # Metrics
//!
//! - `ledger_workflows_total{workflow, outcome}`: workflow invocations by
//!   outcome (`committed`, `conflict`, `fault`)
//! - `ledger_workflow_duration_ms{workflow}`: wall time per invocation
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use tl_server::metrics;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use tourney_ledger::settlement::{SettlementError, SettlementResult};

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Outcome label for a workflow result
pub fn outcome<T>(result: &SettlementResult<T>) -> &'static str {
    match result {
        Ok(_) => "committed",
        Err(SettlementError::Conflict(_)) => "conflict",
        Err(SettlementError::Fault(_)) => "fault",
    }
}

/// Record one workflow invocation that started at `started`.
pub fn record_workflow<T>(workflow: &'static str, result: &SettlementResult<T>, started: Instant) {
    metrics::counter!("ledger_workflows_total",
        "workflow" => workflow,
        "outcome" => outcome(result)
    )
    .increment(1);

    metrics::histogram!("ledger_workflow_duration_ms",
        "workflow" => workflow
    )
    .record(started.elapsed().as_secs_f64() * 1000.0);
}
