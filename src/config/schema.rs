//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::circuit_breaker::CircuitSettings;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Circuit defaults applied to every operation without an override.
    pub circuit: CircuitConfig,

    /// Per-operation overrides.
    pub operations: Vec<OperationConfig>,

    /// Event stream settings.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Resolve the runtime settings for one operation identifier.
    pub fn settings_for(&self, operation: &str) -> CircuitSettings {
        let overrides = self.operations.iter().find(|o| o.name == operation);
        self.circuit.resolve(overrides)
    }
}

/// Circuit breaker tunables, applied as global defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Attempted calls required in the window before the rate is acted on.
    pub minimum_volume: u32,

    /// Failure rate (0–1) at which the circuit opens.
    pub error_rate_threshold: f64,

    /// How long an open circuit waits before permitting a trial call, ms.
    pub cool_down_ms: u64,

    /// Maximum records kept per operation window.
    pub window_capacity: usize,

    /// Maximum record age before eviction, ms.
    pub window_max_age_ms: u64,

    /// Per-call timeout budget, ms. Absent means no gateway-imposed timeout.
    pub call_timeout_ms: Option<u64>,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            minimum_volume: 20,
            error_rate_threshold: 0.5,
            cool_down_ms: 5_000,
            window_capacity: 100,
            window_max_age_ms: 60_000,
            call_timeout_ms: None,
        }
    }
}

impl CircuitConfig {
    /// Resolve runtime settings, applying an operation override on top of
    /// these defaults.
    pub fn resolve(&self, overrides: Option<&OperationConfig>) -> CircuitSettings {
        let o = overrides;
        CircuitSettings {
            minimum_volume: o
                .and_then(|o| o.minimum_volume)
                .unwrap_or(self.minimum_volume),
            error_rate_threshold: o
                .and_then(|o| o.error_rate_threshold)
                .unwrap_or(self.error_rate_threshold),
            cool_down: Duration::from_millis(
                o.and_then(|o| o.cool_down_ms).unwrap_or(self.cool_down_ms),
            ),
            window_capacity: o
                .and_then(|o| o.window_capacity)
                .unwrap_or(self.window_capacity),
            window_max_age: Duration::from_millis(
                o.and_then(|o| o.window_max_age_ms)
                    .unwrap_or(self.window_max_age_ms),
            ),
            call_timeout: o
                .and_then(|o| o.call_timeout_ms)
                .or(self.call_timeout_ms)
                .map(Duration::from_millis),
        }
    }
}

/// Per-operation override. Unset fields fall back to [`CircuitConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationConfig {
    /// Operation identifier this override applies to.
    pub name: String,

    #[serde(default)]
    pub minimum_volume: Option<u32>,

    #[serde(default)]
    pub error_rate_threshold: Option<f64>,

    #[serde(default)]
    pub cool_down_ms: Option<u64>,

    #[serde(default)]
    pub window_capacity: Option<usize>,

    #[serde(default)]
    pub window_max_age_ms: Option<u64>,

    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

/// Event stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Queue capacity per subscriber (events beyond it are dropped).
    pub subscriber_buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = GatewayConfig::default();
        assert_eq!(config.circuit.minimum_volume, 20);
        assert_eq!(config.circuit.error_rate_threshold, 0.5);
        assert_eq!(config.circuit.cool_down_ms, 5_000);
        assert!(config.circuit.call_timeout_ms.is_none());
        assert_eq!(config.events.subscriber_buffer, 256);
    }

    #[test]
    fn test_settings_resolution_prefers_override() {
        let config = GatewayConfig {
            operations: vec![OperationConfig {
                name: "city".to_string(),
                minimum_volume: Some(5),
                error_rate_threshold: None,
                cool_down_ms: Some(100),
                window_capacity: None,
                window_max_age_ms: None,
                call_timeout_ms: Some(250),
            }],
            ..GatewayConfig::default()
        };

        let city = config.settings_for("city");
        assert_eq!(city.minimum_volume, 5);
        assert_eq!(city.error_rate_threshold, 0.5);
        assert_eq!(city.cool_down, Duration::from_millis(100));
        assert_eq!(city.call_timeout, Some(Duration::from_millis(250)));

        let other = config.settings_for("weather");
        assert_eq!(other.minimum_volume, 20);
        assert_eq!(other.cool_down, Duration::from_secs(5));
    }
}
