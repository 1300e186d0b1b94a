//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all violations reported)
//!     → GatewayConfig (validated, immutable)
//!     → per-operation settings resolved by the registry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once accepted; thresholds never change mid-traffic
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::CircuitConfig;
pub use schema::GatewayConfig;
pub use schema::OperationConfig;
