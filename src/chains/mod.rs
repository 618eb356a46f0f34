//! Chain registry subsystem.
//!
//! # Data Flow
//! ```text
//! EngineConfig.chains
//!     → registry.rs (ChainRegistry: name/alias/id → ChainConfig, family resolved once)
//!     → tokens.rs (native-token sentinels normalized per family)
//!     → explorer.rs (user-facing transaction links)
//! ```
//!
//! # Design Decisions
//! - `ChainFamily` is a closed enum; builders match on it instead of on chain names
//! - Lookups are case-insensitive and must resolve to exactly one chain
//! - The registry is read-only after construction and shared via Arc

pub mod explorer;
pub mod registry;
pub mod tokens;

pub use registry::{ChainConfig, ChainFamily, ChainRegistry};
pub use tokens::{is_native_token, normalize_native_token};
