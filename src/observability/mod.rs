//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every gateway decision produces:
//!     → events.rs (structured MetricsEvent fan-out to subscribers)
//!     → metrics.rs (aggregate counters for the Prometheus scrape endpoint)
//!
//! Consumers:
//!     → Dashboard aggregators (event stream, push)
//!     → Metrics endpoint (Prometheus scrape, pull)
//!     → Log aggregation via tracing (logging.rs)
//! ```
//!
//! # Design Decisions
//! - Event delivery is decoupled from the call path; a slow dashboard can
//!   never inflate call latency
//! - Metric updates are cheap (recorder handles, no locking here)

pub mod events;
pub mod logging;
pub mod metrics;
