//! Route aggregator (LI.FI) client.
//!
//! # Data Flow
//! ```text
//! QuoteRequest (normalized tokens, aggregator chain ids)
//!     → client.rs (GET /quote, /status, /chains, /tokens)
//!     → types.rs (Quote parsed from transactionRequest + estimate)
//!     → orchestrator (consumes the Quote by value)
//! ```

pub mod client;
pub mod types;

pub use client::{LifiClient, RouteAggregator};
pub use types::{BridgeStatus, Quote, QuoteKind, QuoteRequest};
