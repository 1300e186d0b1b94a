//! Per-operation state ownership.
//!
//! # Responsibilities
//! - Hold one entry per operation identifier in a concurrent map
//! - Serialize window and circuit mutation behind one lock per entry
//! - Release the half-open trial slot through an RAII guard
//!
//! # Design Decisions
//! - Distinct operations never share a lock (no global contention)
//! - The entry lock is never held across an await
//! - A timed-out or cancelled trial releases its slot on guard drop, so a
//!   lost probe cannot wedge the circuit

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::schema::GatewayConfig;
use crate::resilience::circuit_breaker::{
    CircuitBreaker, CircuitSettings, CircuitState, Permit, ProbeSlot,
};
use crate::resilience::window::{Outcome, RollingWindow, WindowStats};

/// A protected operation: its tunables, rolling window, and circuit state.
#[derive(Debug)]
pub struct Operation {
    name: String,
    settings: CircuitSettings,
    inner: Mutex<OperationInner>,
    probe: ProbeSlot,
}

#[derive(Debug)]
struct OperationInner {
    window: RollingWindow,
    breaker: CircuitBreaker,
}

/// Gate decision for one invocation, carrying the probe guard when the
/// invocation is the half-open trial.
#[derive(Debug)]
pub enum Decision {
    /// Call may proceed.
    Allowed(Option<ProbeGuard>),
    /// Short-circuit to the fallback.
    Rejected,
}

impl Operation {
    fn new(name: &str, settings: CircuitSettings) -> Self {
        Self {
            name: name.to_string(),
            settings: settings.clone(),
            inner: Mutex::new(OperationInner {
                window: RollingWindow::new(settings.window_capacity, settings.window_max_age),
                breaker: CircuitBreaker::new(name),
            }),
            probe: ProbeSlot::default(),
        }
    }

    /// Operation identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved tunables for this operation.
    pub fn settings(&self) -> &CircuitSettings {
        &self.settings
    }

    /// Gate one invocation.
    pub fn permit(self: &Arc<Self>) -> Decision {
        let mut inner = self.inner.lock().expect("operation state poisoned");
        match inner
            .breaker
            .allow(&self.settings, &self.probe, Instant::now())
        {
            Permit::Allowed { probe: true } => Decision::Allowed(Some(ProbeGuard {
                operation: Arc::clone(self),
            })),
            Permit::Allowed { probe: false } => Decision::Allowed(None),
            Permit::Rejected => Decision::Rejected,
        }
    }

    /// Record a completed invocation and drive any transition.
    ///
    /// Returns the circuit state after the record was applied.
    pub fn complete(&self, outcome: Outcome, latency: Duration) -> CircuitState {
        let mut inner = self.inner.lock().expect("operation state poisoned");
        inner.window.record(outcome, latency);
        let stats = inner.window.stats();
        if inner
            .breaker
            .on_result(&self.settings, outcome, stats, Instant::now())
        {
            inner.window.reset();
        }
        inner.breaker.state()
    }

    /// Current circuit state.
    pub fn circuit_state(&self) -> CircuitState {
        self.inner
            .lock()
            .expect("operation state poisoned")
            .breaker
            .state()
    }

    /// Current window statistics.
    pub fn window_stats(&self) -> WindowStats {
        self.inner
            .lock()
            .expect("operation state poisoned")
            .window
            .stats()
    }

    /// Whether a half-open trial is currently in flight.
    pub fn probe_in_flight(&self) -> bool {
        self.probe.in_flight()
    }
}

/// RAII guard for the single half-open trial.
///
/// Dropping the guard releases the slot, covering the success, failure,
/// timeout, and cancellation paths alike.
#[derive(Debug)]
pub struct ProbeGuard {
    operation: Arc<Operation>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.operation.probe.release();
    }
}

/// Point-in-time view of one operation, for dashboards and introspection.
#[derive(Debug, Clone, Serialize)]
pub struct OperationSnapshot {
    pub operation: String,
    pub state: CircuitState,
    pub request_count: u32,
    pub failure_rate: f64,
    pub probe_in_flight: bool,
}

/// Concurrent registry of protected operations, keyed by identifier.
#[derive(Debug)]
pub struct OperationRegistry {
    operations: DashMap<String, Arc<Operation>>,
    config: GatewayConfig,
}

impl OperationRegistry {
    /// Create a registry resolving settings from the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            operations: DashMap::new(),
            config,
        }
    }

    /// Get or lazily create the entry for an operation identifier.
    pub fn get_or_create(&self, name: &str) -> Arc<Operation> {
        if let Some(entry) = self.operations.get(name) {
            return Arc::clone(&entry);
        }
        let settings = self.config.settings_for(name);
        let entry = self
            .operations
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(
                    operation = name,
                    minimum_volume = settings.minimum_volume,
                    error_rate_threshold = settings.error_rate_threshold,
                    cool_down_ms = settings.cool_down.as_millis() as u64,
                    "Protected operation registered"
                );
                Arc::new(Operation::new(name, settings))
            });
        Arc::clone(&entry)
    }

    /// Look up an existing entry without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<Operation>> {
        self.operations.get(name).map(|e| Arc::clone(&e))
    }

    /// Identifiers of all registered operations.
    pub fn operation_names(&self) -> Vec<String> {
        self.operations.iter().map(|e| e.key().clone()).collect()
    }

    /// Registry-wide snapshot for dashboard pulls.
    pub fn snapshot(&self) -> Vec<OperationSnapshot> {
        self.operations
            .iter()
            .map(|e| {
                let op = e.value();
                let stats = op.window_stats();
                OperationSnapshot {
                    operation: op.name().to_string(),
                    state: op.circuit_state(),
                    request_count: stats.request_count,
                    failure_rate: stats.failure_rate,
                    probe_in_flight: op.probe_in_flight(),
                }
            })
            .collect()
    }
}
