//! Resilient remote-call gateway with circuit breaking and health telemetry.
//!
//! Wraps fallible remote dependency calls with failure tracking, state-based
//! call gating, and fallback execution, and publishes a structured event
//! stream consumable by external dashboard aggregators.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                    GATEWAY                     │
//!                    │                                                │
//!   caller ─────────▶│  executor ──▶ circuit breaker ──▶ allow?       │
//!                    │     │              │                │          │
//!                    │     │        rolling window    yes / no        │
//!                    │     ▼              ▲             │    │        │
//!                    │  primary ──outcome─┘       primary  fallback   │──▶ result
//!                    │  (timeout budget)                              │
//!                    │                                                │
//!                    │  ┌──────────────────────────────────────────┐  │
//!                    │  │           Cross-Cutting Concerns         │  │
//!                    │  │  config   events fan-out   metrics/logs  │  │
//!                    │  └──────────────────────────────────────────┘  │
//!                    └────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod resilience;

// Cross-cutting concerns
pub mod observability;

pub use config::loader::load_config;
pub use config::schema::GatewayConfig;
pub use observability::events::MetricsEvent;
pub use resilience::circuit_breaker::CircuitState;
pub use resilience::executor::{Gateway, GatewayError};
pub use resilience::window::Outcome;
