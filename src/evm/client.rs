//! EVM RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the chain's primary and failover JSON-RPC endpoints
//! - Query chain state (nonce, gas price, code, receipts, eth_call)
//! - Submit raw signed transactions
//! - Handle timeouts and network errors by moving to the next provider

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportResult;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::chains::ChainConfig;
use crate::error::{EngineError, EngineResult};
use crate::evm::rpc::EvmRpc;
use crate::observability::metrics;

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// EVM RPC client wrapper with failover support.
#[derive(Clone)]
pub struct EvmClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Chain name for logs.
    chain: String,
    /// Primary endpoint for Debug output.
    rpc_url: String,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl EvmClient {
    /// Create a client for one chain. No network call is made here.
    pub fn new(chain: &ChainConfig, timeout_duration: Duration) -> EngineResult<Self> {
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = chain.rpc_url.parse().map_err(|e| {
            EngineError::RpcUnavailable(format!("Invalid RPC URL '{}': {}", chain.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        // 2. Add failover providers
        for url_str in &chain.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(chain = %chain.name, url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        Ok(Self {
            providers,
            chain: chain.name.clone(),
            rpc_url: chain.rpc_url.clone(),
            timeout_duration,
        })
    }

    /// Run `call` against each provider in order until one succeeds.
    async fn with_failover<T, F, Fut>(&self, operation: &'static str, call: F) -> EngineResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::from("no providers configured");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(chain = %self.chain, provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(chain = %self.chain, provider_idx = i, operation, "RPC timeout, trying next provider");
                    last_error = format!("timeout after {}s", self.timeout_duration.as_secs());
                }
            }
            metrics::record_rpc_failure("evm");
        }
        Err(EngineError::RpcUnavailable(format!(
            "All {} providers failed {}: {}",
            self.providers.len(),
            operation,
            last_error
        )))
    }
}

#[async_trait]
impl EvmRpc for EvmClient {
    async fn chain_id(&self) -> EngineResult<u64> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> EngineResult<u64> {
        self.with_failover("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price(&self) -> EngineResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> EngineResult<u64> {
        self.with_failover("eth_estimateGas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    async fn code_at(&self, address: Address) -> EngineResult<Bytes> {
        self.with_failover("eth_getCode", |p| async move { p.get_code_at(address).await })
            .await
    }

    async fn call(&self, tx: &TransactionRequest) -> EngineResult<Bytes> {
        self.with_failover("eth_call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> EngineResult<TxHash> {
        self.with_failover("eth_sendRawTransaction", |p| async move {
            p.send_raw_transaction(raw).await.map(|pending| *pending.tx_hash())
        })
        .await
    }

    async fn receipt_status(&self, tx_hash: TxHash) -> EngineResult<Option<bool>> {
        self.with_failover("eth_getTransactionReceipt", |p| async move {
            p.get_transaction_receipt(tx_hash)
                .await
                .map(|receipt| receipt.map(|r| r.status()))
        })
        .await
    }
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("chain", &self.chain)
            .field("rpc_url", &self.rpc_url)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
