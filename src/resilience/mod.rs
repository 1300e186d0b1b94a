//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Protected call:
//!     → executor.rs (permit check, timeout budget, fallback, telemetry)
//!     → registry.rs (per-operation state, one lock per identifier)
//!     → circuit_breaker.rs (gates the attempt, drives transitions)
//!     → window.rs (outcome recorded, failure rate computed)
//! ```
//!
//! # Design Decisions
//! - Every completed call has exactly one recorded outcome
//! - The executor never retries; retry policy belongs to the caller
//! - Per-operation state is partitioned by key; no global lock
//! - Circuit transitions are a function of window statistics and the clock

pub mod circuit_breaker;
pub mod executor;
pub mod registry;
pub mod window;
