//! Per-sender nonce lanes.
//!
//! Two sends from the same address on the same chain must not read the
//! same pending nonce. Each (chain, address) pair owns an async mutex held
//! from nonce selection until the transaction is signed. The lane
//! remembers the last nonce it handed out, so the next send uses
//! `max(pending, last + 1)` even when the mempool has not caught up.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::broadcast::{BroadcastOutcome, BroadcastResult, OutcomeSink};
use crate::chains::ChainFamily;
use crate::error::{EngineError, EngineResult};
use crate::evm::rpc::EvmRpc;

type LaneKey = (String, Address);

/// Hands out nonces one sender at a time.
#[derive(Debug, Default)]
pub struct NonceTracker {
    lanes: DashMap<LaneKey, Arc<Mutex<Option<u64>>>>,
}

/// A reserved nonce. The lane stays locked until the lease is dropped.
pub struct NonceLease {
    guard: OwnedMutexGuard<Option<u64>>,
    nonce: u64,
}

impl NonceLease {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Record the nonce as used. Dropping without commit leaves the lane as it was.
    pub fn commit(mut self) {
        *self.guard = Some(self.nonce);
    }
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, chain: &str, address: Address) -> Arc<Mutex<Option<u64>>> {
        self.lanes
            .entry((chain.to_string(), address))
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Lock the sender's lane and pick the next nonce.
    pub async fn acquire(
        &self,
        chain: &str,
        address: Address,
        rpc: &dyn EvmRpc,
    ) -> EngineResult<NonceLease> {
        let guard = self.lane(chain, address).lock_owned().await;
        let pending = rpc
            .pending_nonce(address)
            .await
            .map_err(|e| EngineError::NonceFetchFailed(e.to_string()))?;
        let nonce = match *guard {
            Some(last) if last >= pending => last + 1,
            _ => pending,
        };
        tracing::debug!(chain = %chain, address = %address, pending, nonce, "Nonce reserved");
        Ok(NonceLease { guard, nonce })
    }

    /// Forget the lane's memory so the next send trusts the network again.
    pub async fn reset(&self, chain: &str, address: Address) {
        if let Some(lane) = self.lanes.get(&(chain.to_string(), address)).map(|l| l.clone()) {
            *lane.lock().await = None;
        }
    }

    /// Last nonce committed on the lane, if any.
    pub async fn last_used(&self, chain: &str, address: Address) -> Option<u64> {
        let lane = self.lanes.get(&(chain.to_string(), address)).map(|l| l.clone())?;
        let last = *lane.lock().await;
        last
    }
}

#[async_trait]
impl OutcomeSink for NonceTracker {
    async fn record(&self, outcome: &BroadcastOutcome) {
        if outcome.family != ChainFamily::Evm {
            return;
        }
        if let BroadcastResult::Failed { .. } = outcome.result {
            if let Ok(sender) = outcome.sender.parse::<Address>() {
                let forgotten = self.last_used(&outcome.chain, sender).await;
                tracing::info!(
                    chain = %outcome.chain,
                    sender = %sender,
                    last_nonce = ?forgotten,
                    "Resetting nonce lane after failed broadcast"
                );
                self.reset(&outcome.chain, sender).await;
            }
        }
    }
}
