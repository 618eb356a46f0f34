//! The EVM JSON-RPC surface the engine depends on.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::broadcast::TxSubmitter;
use crate::error::EngineResult;
use crate::transaction::SignedTransaction;

/// Read and submit operations against one EVM chain.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    async fn chain_id(&self) -> EngineResult<u64>;

    /// Nonce including transactions still in the mempool.
    async fn pending_nonce(&self, address: Address) -> EngineResult<u64>;

    /// Suggested legacy gas price in wei.
    async fn gas_price(&self) -> EngineResult<u128>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> EngineResult<u64>;

    async fn code_at(&self, address: Address) -> EngineResult<Bytes>;

    /// Read-only `eth_call` at the latest block.
    async fn call(&self, tx: &TransactionRequest) -> EngineResult<Bytes>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> EngineResult<TxHash>;

    /// `None` while the transaction is not yet mined; otherwise the receipt status.
    async fn receipt_status(&self, tx_hash: TxHash) -> EngineResult<Option<bool>>;
}

/// Submits signed EVM transactions through an `EvmRpc`.
pub struct EvmSubmitter {
    rpc: Arc<dyn EvmRpc>,
}

impl EvmSubmitter {
    pub fn new(rpc: Arc<dyn EvmRpc>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl TxSubmitter for EvmSubmitter {
    async fn submit(&self, tx: &SignedTransaction) -> EngineResult<String> {
        let hash = self.rpc.send_raw_transaction(&tx.raw).await?;
        Ok(format!("{:#x}", hash))
    }
}
