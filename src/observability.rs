use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservation operations. Labels: operation, outcome.
pub const OPERATIONS_TOTAL: &str = "lanecontrol_operations_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const OPERATION_DURATION_SECONDS: &str = "lanecontrol_operation_duration_seconds";

/// Counter: requests turned away by a check. Labels: reason.
pub const REJECTIONS_TOTAL: &str = "lanecontrol_rejections_total";

/// Counter: writes that passed the pre-checks but lost the race under the lane lock.
pub const BACKSTOP_CONFLICTS_TOTAL: &str = "lanecontrol_backstop_conflicts_total";

/// Histogram: lanes returned per lane search.
pub const LANE_SEARCH_RESULTS: &str = "lanecontrol_lane_search_results";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "lanecontrol_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "lanecontrol_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Count one finished operation and its latency.
pub fn record_operation(operation: &'static str, outcome: &'static str, started: Instant) {
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    metrics::counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}
