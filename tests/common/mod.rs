//! Shared utilities for gateway integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use circuit_gateway::config::schema::{CircuitConfig, GatewayConfig};

/// Config with a tight volume threshold and fast cool-down so tests can
/// drive the full state machine in milliseconds.
pub fn tight_config(minimum_volume: u32, cool_down_ms: u64) -> GatewayConfig {
    GatewayConfig {
        circuit: CircuitConfig {
            minimum_volume,
            error_rate_threshold: 0.5,
            cool_down_ms,
            ..CircuitConfig::default()
        },
        ..GatewayConfig::default()
    }
}

/// Shared call counter for programmable primaries and fallbacks.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

#[allow(dead_code)]
impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
