//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! engine.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → ChainRegistry + per-subsystem settings at engine construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the registry is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AggregatorConfig, AllowanceConfig, BridgeConfig, BroadcastConfig, BtcConfig, ChainEntry,
    EngineConfig, EvmConfig, ObservabilityConfig, SolanaConfig,
};
