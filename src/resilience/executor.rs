//! Protected call execution.
//!
//! # Data Flow
//! ```text
//! Gateway::execute(operation, primary, fallback):
//!     → registry.rs (look up or create the operation entry)
//!     → circuit_breaker.rs (permission check)
//!     → allowed: primary under the timeout budget → outcome recorded
//!     → rejected: outcome recorded as Rejected, no attempt made
//!     → observability (event fan-out + aggregate metrics)
//!     → fallback on rejection, failure, or timeout
//! ```
//!
//! # Design Decisions
//! - The executor never retries the primary; retry policy belongs to callers
//! - Exactly one outcome record and one metrics event per invocation
//! - A fallback error is the only error surfaced to the caller
//! - The operation lock is released before any await

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::loader::ConfigError;
use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;
use crate::observability::events::{EventBus, MetricsEvent, Subscription, SubscriptionId};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::registry::{Decision, Operation, OperationRegistry, OperationSnapshot};
use crate::resilience::window::{Outcome, WindowStats};

/// Errors surfaced to [`Gateway::execute`] callers.
///
/// Rejections, failures, and timeouts resolve through the fallback. The
/// fallback erroring is the only case with no further degradation path.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError<E> {
    /// The fallback itself errored after the given outcome.
    #[error("fallback for operation '{operation}' failed after {outcome} outcome")]
    Fatal {
        operation: String,
        outcome: Outcome,
        error: E,
    },
}

enum PrimaryFailure<E> {
    Error(E),
    TimedOut,
}

/// Resilient remote-call gateway.
///
/// Wraps fallible remote operations with circuit breaking, fallback
/// execution, and health telemetry. Cheap to share behind an `Arc`; per
/// operation state is partitioned internally.
///
/// # Example
/// ```no_run
/// use circuit_gateway::{Gateway, GatewayConfig};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = Gateway::new(GatewayConfig::default())?;
///
/// let cities = gateway
///     .execute(
///         "city-service",
///         || async { Err::<Vec<String>, String>("connection refused".into()) },
///         || async { Ok(Vec::new()) },
///     )
///     .await?;
///
/// assert!(cities.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Gateway {
    registry: OperationRegistry,
    events: Arc<EventBus>,
}

impl Gateway {
    /// Create a gateway from a validated configuration.
    ///
    /// Invalid thresholds are rejected here, before any traffic flows.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let events = Arc::new(EventBus::new(config.events.subscriber_buffer));
        Ok(Self {
            registry: OperationRegistry::new(config),
            events,
        })
    }

    /// Create a gateway with default configuration.
    pub fn new_default() -> Self {
        Self::new(GatewayConfig::default()).expect("default configuration is valid")
    }

    /// Execute `primary` under circuit protection, falling back on
    /// rejection, failure, or timeout.
    ///
    /// Returns the fallback's value on any non-fatal degradation; the only
    /// error is [`GatewayError::Fatal`], raised when the fallback itself
    /// errors.
    pub async fn execute<T, E, P, PFut, F, FFut>(
        &self,
        operation: &str,
        primary: P,
        fallback: F,
    ) -> Result<T, GatewayError<E>>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T, E>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T, E>>,
    {
        let op = self.registry.get_or_create(operation);

        match op.permit() {
            Decision::Rejected => {
                let state = op.complete(Outcome::Rejected, Duration::ZERO);
                tracing::debug!(
                    operation = %op.name(),
                    state = %state,
                    "Call rejected by circuit; using fallback"
                );
                self.emit(&op, state, Outcome::Rejected, Duration::ZERO);
                self.run_fallback(op.name(), Outcome::Rejected, fallback)
                    .await
            }
            Decision::Allowed(probe) => {
                let started = Instant::now();
                let result = match op.settings().call_timeout {
                    Some(budget) => match tokio::time::timeout(budget, primary()).await {
                        Ok(inner) => inner.map_err(PrimaryFailure::Error),
                        Err(_) => Err(PrimaryFailure::TimedOut),
                    },
                    None => primary().await.map_err(PrimaryFailure::Error),
                };
                let latency = started.elapsed();

                match result {
                    Ok(value) => {
                        let state = op.complete(Outcome::Success, latency);
                        drop(probe);
                        self.emit(&op, state, Outcome::Success, latency);
                        Ok(value)
                    }
                    Err(PrimaryFailure::TimedOut) => {
                        let state = op.complete(Outcome::Timeout, latency);
                        drop(probe);
                        tracing::warn!(
                            operation = %op.name(),
                            latency_ms = latency.as_millis() as u64,
                            state = %state,
                            "Primary call timed out; using fallback"
                        );
                        self.emit(&op, state, Outcome::Timeout, latency);
                        self.run_fallback(op.name(), Outcome::Timeout, fallback)
                            .await
                    }
                    Err(PrimaryFailure::Error(_)) => {
                        let state = op.complete(Outcome::Failure, latency);
                        drop(probe);
                        tracing::debug!(
                            operation = %op.name(),
                            state = %state,
                            "Primary call failed; using fallback"
                        );
                        self.emit(&op, state, Outcome::Failure, latency);
                        self.run_fallback(op.name(), Outcome::Failure, fallback)
                            .await
                    }
                }
            }
        }
    }

    async fn run_fallback<T, E, F, FFut>(
        &self,
        operation: &str,
        outcome: Outcome,
        fallback: F,
    ) -> Result<T, GatewayError<E>>
    where
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T, E>>,
    {
        match fallback().await {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::error!(
                    operation = operation,
                    outcome = %outcome,
                    "Fallback failed; no degradation path left"
                );
                Err(GatewayError::Fatal {
                    operation: operation.to_string(),
                    outcome,
                    error,
                })
            }
        }
    }

    fn emit(&self, op: &Operation, state: CircuitState, outcome: Outcome, latency: Duration) {
        metrics::record_call(op.name(), outcome, latency);
        metrics::record_circuit_state(op.name(), state);
        self.events
            .publish(MetricsEvent::new(op.name(), state, outcome, latency));
    }

    /// Register a metrics subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Remove a metrics subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Shared handle to the event bus.
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Circuit state for an operation, if it has been seen.
    pub fn circuit_state(&self, operation: &str) -> Option<CircuitState> {
        self.registry.get(operation).map(|op| op.circuit_state())
    }

    /// Window statistics for an operation, if it has been seen.
    pub fn window_stats(&self, operation: &str) -> Option<WindowStats> {
        self.registry.get(operation).map(|op| op.window_stats())
    }

    /// Identifiers of all registered operations.
    pub fn operation_names(&self) -> Vec<String> {
        self.registry.operation_names()
    }

    /// Registry-wide snapshot for dashboard pulls.
    pub fn snapshot(&self) -> Vec<OperationSnapshot> {
        self.registry.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CircuitConfig, GatewayConfig};

    fn gateway(circuit: CircuitConfig) -> Gateway {
        let config = GatewayConfig {
            circuit,
            ..GatewayConfig::default()
        };
        Gateway::new(config).expect("test configuration is valid")
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let gateway = Gateway::new_default();
        let result = gateway
            .execute(
                "city",
                || async { Ok::<_, String>(42) },
                || async { Ok(0) },
            )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            gateway.circuit_state("city"),
            Some(CircuitState::Closed)
        );
    }

    #[tokio::test]
    async fn test_failure_resolves_via_fallback() {
        let gateway = Gateway::new_default();
        let result = gateway
            .execute(
                "city",
                || async { Err::<i32, String>("boom".into()) },
                || async { Ok(0) },
            )
            .await;
        assert_eq!(result.unwrap(), 0);
        let stats = gateway.window_stats("city").unwrap();
        assert_eq!(stats.request_count, 1);
        assert_eq!(stats.failure_rate, 1.0);
    }

    #[tokio::test]
    async fn test_fallback_error_is_fatal() {
        let gateway = Gateway::new_default();
        let result = gateway
            .execute(
                "city",
                || async { Err::<i32, String>("boom".into()) },
                || async { Err("fallback down".into()) },
            )
            .await;
        match result {
            Err(GatewayError::Fatal {
                operation, outcome, ..
            }) => {
                assert_eq!(operation, "city");
                assert_eq!(outcome, Outcome::Failure);
            }
            other => panic!("expected Fatal, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_timeout_budget_enforced() {
        let circuit = CircuitConfig {
            call_timeout_ms: Some(20),
            ..CircuitConfig::default()
        };
        let gateway = gateway(circuit);

        let result = gateway
            .execute(
                "slow",
                || async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, String>(1)
                },
                || async { Ok(-1) },
            )
            .await;
        assert_eq!(result.unwrap(), -1);

        let mut sub_events = Vec::new();
        let mut sub = gateway.subscribe();
        // Event was published before subscribe; re-run to observe one.
        let _ = gateway
            .execute(
                "slow",
                || async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, String>(1)
                },
                || async { Ok(-1) },
            )
            .await;
        sub_events.extend(sub.drain());
        assert_eq!(sub_events.len(), 1);
        assert_eq!(sub_events[0].outcome, Outcome::Timeout);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_setup() {
        let circuit = CircuitConfig {
            error_rate_threshold: 1.5,
            ..CircuitConfig::default()
        };
        let config = GatewayConfig {
            circuit,
            ..GatewayConfig::default()
        };
        assert!(Gateway::new(config).is_err());
    }
}
