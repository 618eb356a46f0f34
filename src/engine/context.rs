//! Shared collaborators for one engine instance.

use std::sync::Arc;

use crate::aggregator::RouteAggregator;
use crate::allowance::AllowanceManager;
use crate::broadcast::{BroadcastDispatcher, OutcomeSink, OutcomeStore, TracingOutcomeSink};
use crate::chains::{ChainConfig, ChainRegistry};
use crate::config::EngineConfig;
use crate::engine::backends::ChainBackends;
use crate::error::EngineResult;
use crate::evm::{self, EvmRpc, EvmTxBuilder, EvmWallet, NonceTracker};
use crate::keys::KeyProvider;
use crate::solana::{self, SolanaKeypair, SolanaRpc, SolanaTxBuilder};

/// Everything a request needs, built once and passed by reference.
pub struct EngineContext {
    pub config: EngineConfig,
    pub registry: ChainRegistry,
    pub keys: Arc<dyn KeyProvider>,
    pub aggregator: Arc<dyn RouteAggregator>,
    pub backends: Arc<dyn ChainBackends>,
    pub dispatcher: BroadcastDispatcher,
    pub nonces: Arc<NonceTracker>,
    pub outcomes: Arc<OutcomeStore>,
}

impl EngineContext {
    pub fn new(
        config: EngineConfig,
        registry: ChainRegistry,
        keys: Arc<dyn KeyProvider>,
        aggregator: Arc<dyn RouteAggregator>,
        backends: Arc<dyn ChainBackends>,
    ) -> Self {
        let nonces = Arc::new(NonceTracker::new());
        let outcomes = Arc::new(OutcomeStore::with_capacity(config.broadcast.outcome_capacity));
        let sinks: Vec<Arc<dyn OutcomeSink>> = vec![
            Arc::new(TracingOutcomeSink),
            outcomes.clone(),
            nonces.clone(),
        ];
        let dispatcher = BroadcastDispatcher::new(&config.broadcast, sinks);
        Self {
            config,
            registry,
            keys,
            aggregator,
            backends,
            dispatcher,
            nonces,
            outcomes,
        }
    }

    /// Builder for `from_address` on an EVM chain, after checking the key controls it.
    pub async fn evm_builder(
        &self,
        chain: &ChainConfig,
        from_address: &str,
    ) -> EngineResult<(EvmTxBuilder, Arc<dyn EvmRpc>)> {
        let from = evm::parse_address(from_address)?;
        let chain_id = chain.evm_chain_id()?;
        let rpc = self.backends.evm(chain)?;
        let key = self.keys.signing_key(from_address).await?;
        let wallet = EvmWallet::from_key(&key, chain_id)?;
        wallet.ensure_address(from)?;
        let builder = EvmTxBuilder::new(&chain.name, rpc.clone(), self.nonces.clone(), wallet);
        Ok((builder, rpc))
    }

    pub fn allowance_manager(&self, chain: &ChainConfig, rpc: Arc<dyn EvmRpc>) -> AllowanceManager {
        AllowanceManager::new(&chain.name, rpc, self.config.allowance.clone())
    }

    /// Keypair and builder for `from_address` on a Solana chain.
    pub async fn solana_signer(
        &self,
        chain: &ChainConfig,
        from_address: &str,
    ) -> EngineResult<(SolanaTxBuilder, SolanaKeypair, Arc<dyn SolanaRpc>)> {
        let rpc = self.backends.solana(chain)?;
        let key = self.keys.signing_key(from_address).await?;
        let keypair = solana::materialize_account(&key, from_address)?;
        let builder = SolanaTxBuilder::new(&chain.name, rpc.clone(), self.config.solana.degraded_mode);
        Ok((builder, keypair, rpc))
    }
}
