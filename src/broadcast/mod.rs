//! Broadcast subsystem.
//!
//! # Data Flow
//! ```text
//! SignedTransaction (local id fixed at signing)
//!     → dispatcher.rs
//!         detached: spawned task, bounded by a semaphore, caller gets the local id now
//!         synchronous: caller awaits the network id or BroadcastFailed
//!     → TxSubmitter (EVM RPC, Esplora, Solana RPC)
//!     → outcome.rs (BroadcastOutcome delivered to every OutcomeSink)
//! ```
//!
//! # Design Decisions
//! - Retries resend the identical signed bytes; nothing is re-signed
//! - Detached failures never reach the original caller; sinks are the only channel
//! - "already known" style rejections count as acceptance

pub mod dispatcher;
pub mod outcome;

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::transaction::SignedTransaction;

pub use dispatcher::BroadcastDispatcher;
pub use outcome::{BroadcastOutcome, BroadcastResult, OutcomeSink, OutcomeStore, TracingOutcomeSink};

/// Hands signed bytes to a network. Returns the id the network reports.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit(&self, tx: &SignedTransaction) -> EngineResult<String>;
}
