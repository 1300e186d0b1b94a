//! Aggregate metrics exposition.
//!
//! # Metrics
//! - `gateway_calls_total` (counter): invocations by operation, outcome
//! - `gateway_call_duration_seconds` (histogram): attempt latency by operation
//! - `gateway_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! # Design Decisions
//! - Low-overhead metric updates on the call path
//! - Labels for operation, outcome
//! - Exposition is served by the Prometheus exporter's own listener

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::window::Outcome;

/// Install the Prometheus recorder and exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(
                "gateway_calls_total",
                "Gateway invocations by operation and outcome"
            );
            describe_histogram!(
                "gateway_call_duration_seconds",
                Unit::Seconds,
                "Latency of attempted remote calls"
            );
            describe_gauge!(
                "gateway_circuit_state",
                "Circuit state per operation (0=closed, 1=open, 2=half-open)"
            );
            tracing::info!(address = %addr, "Metrics exposition listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record one completed invocation.
pub fn record_call(operation: &str, outcome: Outcome, latency: Duration) {
    counter!(
        "gateway_calls_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    // Rejections carry no attempt latency.
    if outcome.is_attempt() {
        histogram!(
            "gateway_call_duration_seconds",
            "operation" => operation.to_string()
        )
        .record(latency.as_secs_f64());
    }
}

/// Record the circuit state observed at emission time.
pub fn record_circuit_state(operation: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!(
        "gateway_circuit_state",
        "operation" => operation.to_string()
    )
    .set(value);
}
