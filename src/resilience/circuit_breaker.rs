//! Circuit breaker for remote dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: request count ≥ minimum volume AND failure rate ≥ threshold
//! Open → Half-Open: after cool-down elapses
//! Half-Open → Closed: probe call succeeds (window reset)
//! Half-Open → Open: probe call fails or times out (fresh cool-down clock)
//! ```
//!
//! # Design Decisions
//! - Per-operation circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open (prevents hammering a recovering dependency)
//! - Transitions are driven only by window statistics and the clock

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::resilience::window::{Outcome, WindowStats};

/// Circuit state for one protected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls permitted.
    Closed,
    /// Dependency considered down; calls rejected immediately.
    Open,
    /// One trial call permitted to test recovery.
    HalfOpen,
}

impl CircuitState {
    /// Stable label for metrics and events.
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved runtime tunables for one operation's circuit.
#[derive(Debug, Clone)]
pub struct CircuitSettings {
    /// Attempted calls required in the window before the rate is acted on.
    pub minimum_volume: u32,
    /// Failure rate (0–1) at which the circuit opens.
    pub error_rate_threshold: f64,
    /// How long an open circuit waits before permitting a trial call.
    pub cool_down: Duration,
    /// Maximum records kept in the operation's window.
    pub window_capacity: usize,
    /// Maximum record age before eviction.
    pub window_max_age: Duration,
    /// Per-call timeout budget. None means no gateway-imposed timeout.
    pub call_timeout: Option<Duration>,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            minimum_volume: 20,
            error_rate_threshold: 0.5,
            cool_down: Duration::from_secs(5),
            window_capacity: 100,
            window_max_age: Duration::from_secs(60),
            call_timeout: None,
        }
    }
}

/// Gating decision for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// Call may proceed. `probe` marks the half-open trial.
    Allowed { probe: bool },
    /// Circuit is open, or a trial is already in flight.
    Rejected,
}

/// The single half-open trial slot, claimed with a compare-and-swap.
///
/// Claiming is atomic so a concurrent `allow` cannot win a second trial
/// between check and act.
#[derive(Debug, Default)]
pub struct ProbeSlot(AtomicBool);

impl ProbeSlot {
    /// Claim the trial slot. Returns false if a trial is already in flight.
    pub fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the trial slot.
    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether a trial is currently in flight.
    pub fn in_flight(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-operation circuit state machine.
///
/// Owned by the operation registry; all mutation goes through
/// [`CircuitBreaker::allow`] and [`CircuitBreaker::on_result`] under the
/// operation's lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    operation: String,
    state: CircuitState,
    entered_at: Instant,
}

impl CircuitBreaker {
    /// Create a breaker in the Closed state.
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            state: CircuitState::Closed,
            entered_at: Instant::now(),
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// How long the machine has been in its current state.
    pub fn time_in_state(&self, now: Instant) -> Duration {
        now.duration_since(self.entered_at)
    }

    /// Gating decision for one invocation.
    ///
    /// May transition Open → Half-Open when the cool-down has elapsed. A
    /// half-open permit claims the trial slot; the claim must be released
    /// when the trial resolves.
    pub fn allow(&mut self, settings: &CircuitSettings, probe: &ProbeSlot, now: Instant) -> Permit {
        match self.state {
            CircuitState::Closed => Permit::Allowed { probe: false },
            CircuitState::Open => {
                if now.duration_since(self.entered_at) >= settings.cool_down {
                    self.transition(CircuitState::HalfOpen, now);
                    if probe.try_claim() {
                        Permit::Allowed { probe: true }
                    } else {
                        Permit::Rejected
                    }
                } else {
                    Permit::Rejected
                }
            }
            CircuitState::HalfOpen => {
                if probe.try_claim() {
                    Permit::Allowed { probe: true }
                } else {
                    Permit::Rejected
                }
            }
        }
    }

    /// Feed a completed invocation into the transition logic.
    ///
    /// Returns true when the window must be reset (the half-open probe
    /// succeeded and the circuit closed).
    pub fn on_result(
        &mut self,
        settings: &CircuitSettings,
        outcome: Outcome,
        stats: WindowStats,
        now: Instant,
    ) -> bool {
        // Rejections never drive transitions.
        if !outcome.is_attempt() {
            return false;
        }

        match self.state {
            CircuitState::Closed => {
                if stats.request_count >= settings.minimum_volume
                    && stats.failure_rate >= settings.error_rate_threshold
                {
                    tracing::warn!(
                        operation = %self.operation,
                        request_count = stats.request_count,
                        failure_rate = stats.failure_rate,
                        cool_down_ms = settings.cool_down.as_millis() as u64,
                        "Circuit opened (failing fast)"
                    );
                    self.transition(CircuitState::Open, now);
                }
                false
            }
            CircuitState::HalfOpen => {
                if outcome.is_failure() {
                    tracing::warn!(
                        operation = %self.operation,
                        outcome = %outcome,
                        "Probe failed; circuit re-opened"
                    );
                    self.transition(CircuitState::Open, now);
                    false
                } else {
                    tracing::info!(
                        operation = %self.operation,
                        "Probe succeeded; circuit closed"
                    );
                    self.transition(CircuitState::Closed, now);
                    true
                }
            }
            // A call admitted before the circuit opened may resolve late; it
            // is recorded, but only the cool-down clock leaves Open.
            CircuitState::Open => false,
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) {
        tracing::debug!(
            operation = %self.operation,
            from = %self.state,
            to = %to,
            "Circuit state transition"
        );
        self.state = to;
        self.entered_at = now;
    }
}
