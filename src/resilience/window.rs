//! Rolling outcome window.
//!
//! # Responsibilities
//! - Record one outcome per completed gateway invocation
//! - Evict records past the capacity or age bound (lazy, on write and read)
//! - Compute request count and failure rate over attempted calls
//!
//! # Design Decisions
//! - Rejections are recorded but excluded from the failure rate: a rejection
//!   is a gateway decision, not evidence about the remote dependency
//! - An empty window reports count 0 and rate 0.0 (never divides by zero)

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Outcome of a single gateway invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Primary call returned a value.
    Success,
    /// Primary call returned an error.
    Failure,
    /// Circuit was open; no attempt was made.
    Rejected,
    /// Primary call exceeded the timeout budget.
    Timeout,
}

impl Outcome {
    /// True for outcomes that count against the dependency.
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failure | Outcome::Timeout)
    }

    /// True when the remote call was actually attempted.
    pub fn is_attempt(self) -> bool {
        !matches!(self, Outcome::Rejected)
    }

    /// Stable label for metrics and events.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Rejected => "rejected",
            Outcome::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded outcome. Immutable once appended.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeRecord {
    /// When the record was appended.
    pub recorded_at: Instant,
    /// How the invocation resolved.
    pub outcome: Outcome,
    /// Time spent in the primary call (zero for rejections).
    pub latency: Duration,
}

/// Snapshot of window statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Attempted calls currently inside the window.
    pub request_count: u32,
    /// Failures and timeouts over attempted calls; 0.0 when empty.
    pub failure_rate: f64,
}

/// Bounded rolling window of outcome records for one operation.
#[derive(Debug)]
pub struct RollingWindow {
    records: VecDeque<OutcomeRecord>,
    capacity: usize,
    max_age: Duration,
}

impl RollingWindow {
    /// Create a window bounded by `capacity` records and `max_age` per record.
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            max_age,
        }
    }

    /// Append a record, evicting whatever the bounds no longer admit.
    pub fn record(&mut self, outcome: Outcome, latency: Duration) {
        let now = Instant::now();
        self.evict_aged(now);
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(OutcomeRecord {
            recorded_at: now,
            outcome,
            latency,
        });
    }

    /// Compute statistics over the current window contents.
    pub fn stats(&mut self) -> WindowStats {
        self.evict_aged(Instant::now());
        let mut attempts = 0u32;
        let mut failures = 0u32;
        for record in &self.records {
            if record.outcome.is_attempt() {
                attempts += 1;
                if record.outcome.is_failure() {
                    failures += 1;
                }
            }
        }
        let failure_rate = if attempts == 0 {
            0.0
        } else {
            f64::from(failures) / f64::from(attempts)
        };
        WindowStats {
            request_count: attempts,
            failure_rate,
        }
    }

    /// Drop all records. Called when the circuit closes after recovery.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Number of records currently held, rejections included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn evict_aged(&mut self, now: Instant) {
        while let Some(front) = self.records.front() {
            if now.duration_since(front.recorded_at) > self.max_age {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> RollingWindow {
        RollingWindow::new(10, Duration::from_secs(60))
    }

    #[test]
    fn test_empty_window_stats() {
        let mut w = window();
        let stats = w.stats();
        assert_eq!(stats.request_count, 0);
        assert_eq!(stats.failure_rate, 0.0);
    }

    #[test]
    fn test_failure_rate() {
        let mut w = window();
        for _ in 0..3 {
            w.record(Outcome::Success, Duration::from_millis(5));
        }
        for _ in 0..3 {
            w.record(Outcome::Failure, Duration::from_millis(5));
        }
        let stats = w.stats();
        assert_eq!(stats.request_count, 6);
        assert_eq!(stats.failure_rate, 0.5);
    }

    #[test]
    fn test_rejections_do_not_count_as_attempts() {
        let mut w = window();
        w.record(Outcome::Failure, Duration::from_millis(5));
        for _ in 0..5 {
            w.record(Outcome::Rejected, Duration::ZERO);
        }
        let stats = w.stats();
        assert_eq!(stats.request_count, 1);
        assert_eq!(stats.failure_rate, 1.0);
        assert_eq!(w.len(), 6);
    }

    #[test]
    fn test_capacity_eviction() {
        let mut w = RollingWindow::new(4, Duration::from_secs(60));
        for _ in 0..4 {
            w.record(Outcome::Failure, Duration::ZERO);
        }
        for _ in 0..4 {
            w.record(Outcome::Success, Duration::ZERO);
        }
        let stats = w.stats();
        assert_eq!(stats.request_count, 4);
        assert_eq!(stats.failure_rate, 0.0, "old failures must be evicted");
    }

    #[test]
    fn test_age_eviction() {
        let mut w = RollingWindow::new(10, Duration::from_millis(20));
        w.record(Outcome::Failure, Duration::ZERO);
        std::thread::sleep(Duration::from_millis(40));
        let stats = w.stats();
        assert_eq!(stats.request_count, 0);
        assert!(w.is_empty());
    }

    #[test]
    fn test_stats_idempotent() {
        let mut w = window();
        w.record(Outcome::Success, Duration::from_millis(1));
        w.record(Outcome::Failure, Duration::from_millis(1));
        let first = w.stats();
        let second = w.stats();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut w = window();
        w.record(Outcome::Failure, Duration::ZERO);
        w.record(Outcome::Rejected, Duration::ZERO);
        w.reset();
        assert!(w.is_empty());
        assert_eq!(w.stats().request_count, 0);
    }
}
