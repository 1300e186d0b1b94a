//! Metrics event stream.
//!
//! # Responsibilities
//! - Fan each gateway decision out to registered subscribers
//! - Keep delivery best-effort: the call path never waits on a subscriber
//!
//! # Design Decisions
//! - Bounded per-subscriber queues with try_send; a full queue drops the
//!   event for that subscriber only
//! - Closed subscribers are pruned on the next publish
//! - Subscriber failures are logged and swallowed, never surfaced to callers

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::window::Outcome;

/// One gateway decision, as seen by dashboard aggregators.
///
/// Serializes to `{operation, state, outcome, latency_ms, timestamp}` with
/// an RFC 3339 timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsEvent {
    /// Protected operation identifier.
    pub operation: String,
    /// Circuit state at emission time.
    pub state: CircuitState,
    /// How the invocation resolved.
    pub outcome: Outcome,
    /// Time spent in the primary call (zero for rejections).
    pub latency_ms: u64,
    /// Wall-clock emission time.
    pub timestamp: DateTime<Utc>,
}

impl MetricsEvent {
    /// Build an event for one completed invocation.
    pub fn new(operation: &str, state: CircuitState, outcome: Outcome, latency: Duration) -> Self {
        Self {
            operation: operation.to_string(),
            state,
            outcome,
            latency_ms: latency.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}

/// Handle identifying a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A subscriber's receiving half.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<MetricsEvent>,
}

impl Subscription {
    /// The handle to pass to [`EventBus::unsubscribe`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next event. Returns None once unsubscribed.
    pub async fn recv(&mut self) -> Option<MetricsEvent> {
        self.rx.recv().await
    }

    /// Drain whatever is currently queued without waiting.
    pub fn drain(&mut self) -> Vec<MetricsEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Fan-out hub publishing [`MetricsEvent`]s to registered subscribers.
#[derive(Debug)]
pub struct EventBus {
    subscribers: DashMap<SubscriptionId, mpsc::Sender<MetricsEvent>>,
    buffer: usize,
}

impl EventBus {
    /// Create a bus with the given per-subscriber queue capacity.
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            buffer,
        }
    }

    /// Register a subscriber and hand back its receiving half.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers.insert(id, tx);
        tracing::debug!(subscriber = %id, "Metrics subscriber registered");
        Subscription { id, rx }
    }

    /// Remove a subscriber. Returns false if the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "Metrics subscriber removed");
        }
        removed
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Best-effort fan-out. Never blocks and never fails the caller.
    pub fn publish(&self, event: MetricsEvent) {
        if self.subscribers.is_empty() {
            return;
        }

        let mut gone = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(
                        subscriber = %entry.key(),
                        operation = %event.operation,
                        "Subscriber queue full; event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    gone.push(*entry.key());
                }
            }
        }
        for id in gone {
            self.subscribers.remove(&id);
            tracing::debug!(subscriber = %id, "Subscriber receiver dropped; pruned");
        }
    }
}
