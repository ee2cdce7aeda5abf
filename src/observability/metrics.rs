//! Client metrics.
//!
//! # Metrics
//! - `rpc_attempts_total` (counter): attempts by outcome and error code
//! - `rpc_attempt_duration_seconds` (histogram): per-attempt latency
//! - `rpc_pool_connections_created_total` (counter): new connections by route
//!
//! # Design Decisions
//! - Only the `metrics` facade is used; installing a recorder/exporter is
//!   the embedding application's job, and without one every call is a no-op
//! - Callers check `observability.metrics_enabled` before recording

use std::time::Duration;

/// Record one attempt's outcome; `code` is `None` on success.
pub fn record_attempt(code: Option<&str>, elapsed: Duration) {
    let outcome = if code.is_some() { "failure" } else { "success" };
    metrics::counter!(
        "rpc_attempts_total",
        "outcome" => outcome,
        "code" => code.unwrap_or("none").to_string()
    )
    .increment(1);
    metrics::histogram!("rpc_attempt_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

pub fn record_connection_created(route: &str) {
    metrics::counter!("rpc_pool_connections_created_total", "route" => route.to_string())
        .increment(1);
}
