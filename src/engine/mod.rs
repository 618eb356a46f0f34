//! Transaction engine facade.
//!
//! # Responsibilities
//! - Resolve the chain once and route by family
//! - Send, approve and allowance operations
//! - Delegate swaps and bridges to the orchestrator
//! - Record per-operation metrics
//!
//! # Data Flow
//! ```text
//! request DTO → registry.resolve → family builder (evm | btc | solana)
//!     → SignedTransaction → dispatcher (detached for sends, synchronous otherwise)
//!     → TransactionResponse { tx_hash = local id, status }
//! ```

pub mod approve;
pub mod backends;
pub mod context;
pub mod send;
pub mod types;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::aggregator::{LifiClient, RouteAggregator};
use crate::broadcast::{BroadcastDispatcher, BroadcastOutcome};
use crate::chains::ChainRegistry;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::keys::KeyProvider;
use crate::observability::metrics;
use crate::orchestrator::Orchestrator;

pub use backends::{ChainBackends, LiveBackends};
pub use context::EngineContext;
pub use types::*;

/// Run `fut` and record its outcome and latency.
pub(crate) async fn observed<T, F>(operation: &'static str, chain: &str, fut: F) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(operation, chain = %chain, error = %e, "Request failed");
            e.kind()
        }
    };
    metrics::record_request(operation, chain, outcome, start.elapsed());
    result
}

/// Metrics chain label for a status query; the source chain when known.
fn status_chain_label(request: &BridgeStatusRequest) -> String {
    request
        .from_chain_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Entry point for every operation.
pub struct TransactionEngine {
    ctx: Arc<EngineContext>,
    orchestrator: Orchestrator,
}

impl TransactionEngine {
    pub fn new(
        config: EngineConfig,
        registry: ChainRegistry,
        keys: Arc<dyn KeyProvider>,
        aggregator: Arc<dyn RouteAggregator>,
        backends: Arc<dyn ChainBackends>,
    ) -> Self {
        let ctx = Arc::new(EngineContext::new(config, registry, keys, aggregator, backends));
        Self {
            orchestrator: Orchestrator::new(ctx.clone()),
            ctx,
        }
    }

    /// Engine with live network clients for every configured chain.
    pub fn from_config(config: EngineConfig, keys: Arc<dyn KeyProvider>) -> EngineResult<Self> {
        let registry = ChainRegistry::new(&config.chains);
        let aggregator: Arc<dyn RouteAggregator> = Arc::new(LifiClient::new(&config.aggregator)?);
        let backends: Arc<dyn ChainBackends> = Arc::new(LiveBackends::new(&config));
        tracing::info!(chains = registry.len(), "Transaction engine ready");
        Ok(Self::new(config, registry, keys, aggregator, backends))
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn dispatcher(&self) -> &BroadcastDispatcher {
        &self.ctx.dispatcher
    }

    /// Terminal result of a detached broadcast, once it has finished.
    pub fn broadcast_outcome(&self, local_tx_id: &str) -> Option<BroadcastOutcome> {
        self.ctx.outcomes.get(local_tx_id)
    }

    pub async fn swap(&self, request: &SwapRequest) -> EngineResult<TransactionResponse> {
        observed("swap", &request.chain, self.orchestrator.swap(request)).await
    }

    pub async fn bridge_quote(&self, request: &BridgeQuoteRequest) -> EngineResult<BridgeQuoteResponse> {
        let chain = request.from_chain_id.to_string();
        observed("bridge_quote", &chain, self.orchestrator.bridge_quote(request)).await
    }

    pub async fn bridge_execute(
        &self,
        request: &BridgeExecuteRequest,
    ) -> EngineResult<BridgeExecuteResponse> {
        let chain = request.from_chain_id.to_string();
        observed("bridge_execute", &chain, self.orchestrator.bridge_execute(request)).await
    }

    pub async fn bridge_status(&self, request: &BridgeStatusRequest) -> EngineResult<BridgeStatusResponse> {
        let chain = status_chain_label(request);
        observed("bridge_status", &chain, self.orchestrator.bridge_status(request)).await
    }

    pub async fn bridge_status_polling(
        &self,
        request: &BridgeStatusRequest,
        max_attempts: Option<u32>,
    ) -> EngineResult<BridgeStatusResponse> {
        let chain = status_chain_label(request);
        observed(
            "bridge_status_polling",
            &chain,
            self.orchestrator.bridge_status_polling(request, max_attempts),
        )
        .await
    }

    /// Chains the aggregator supports.
    pub async fn supported_chains(&self) -> EngineResult<Value> {
        self.ctx.aggregator.chains().await
    }

    /// Tokens the aggregator supports on `chain_ids` (all when empty).
    pub async fn supported_tokens(&self, chain_ids: &[u64]) -> EngineResult<Value> {
        self.ctx.aggregator.tokens(chain_ids).await
    }

    /// Wait for detached broadcasts. Returns false if some were still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.ctx.dispatcher.drain(timeout).await
    }
}
