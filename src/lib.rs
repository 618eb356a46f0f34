//! Custodial multi-chain transaction engine.
//!
//! Builds, signs and submits transfers, swaps and bridges on EVM chains,
//! Bitcoin testnet and Solana from keys held by a `KeyProvider`.

pub mod aggregator;
pub mod allowance;
pub mod amount;
pub mod broadcast;
pub mod btc;
pub mod chains;
pub mod config;
pub mod engine;
pub mod error;
pub mod evm;
pub mod keys;
pub mod observability;
pub mod orchestrator;
pub mod resilience;
pub mod solana;
pub mod transaction;

pub use config::EngineConfig;
pub use engine::TransactionEngine;
pub use error::{EngineError, EngineResult};
