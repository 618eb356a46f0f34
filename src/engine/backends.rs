//! Per-chain RPC client factory.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::btc::{EsploraClient, UtxoIndexer};
use crate::chains::{ChainConfig, ChainFamily};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::evm::{EvmClient, EvmRpc};
use crate::solana::{SolanaRpc, SolanaRpcClient};

/// Hands out network clients for a resolved chain.
pub trait ChainBackends: Send + Sync {
    fn evm(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn EvmRpc>>;
    fn utxo(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn UtxoIndexer>>;
    fn solana(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn SolanaRpc>>;
}

fn expect_family(chain: &ChainConfig, family: ChainFamily) -> EngineResult<()> {
    if chain.family != family {
        return Err(EngineError::UnsupportedChain(format!(
            "{} is not a {} chain",
            chain.name,
            family.as_str()
        )));
    }
    Ok(())
}

/// Real clients, created on first use and cached by chain name.
pub struct LiveBackends {
    evm_timeout: Duration,
    btc_timeout: Duration,
    sol_timeout: Duration,
    commitment: String,
    evm: DashMap<String, Arc<dyn EvmRpc>>,
    utxo: DashMap<String, Arc<dyn UtxoIndexer>>,
    solana: DashMap<String, Arc<dyn SolanaRpc>>,
}

impl LiveBackends {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            evm_timeout: Duration::from_secs(config.evm.rpc_timeout_secs),
            btc_timeout: Duration::from_secs(config.btc.request_timeout_secs),
            sol_timeout: Duration::from_secs(config.solana.request_timeout_secs),
            commitment: config.solana.commitment.clone(),
            evm: DashMap::new(),
            utxo: DashMap::new(),
            solana: DashMap::new(),
        }
    }
}

impl ChainBackends for LiveBackends {
    fn evm(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn EvmRpc>> {
        expect_family(chain, ChainFamily::Evm)?;
        if let Some(client) = self.evm.get(&chain.name) {
            return Ok(client.clone());
        }
        let client: Arc<dyn EvmRpc> = Arc::new(EvmClient::new(chain, self.evm_timeout)?);
        tracing::debug!(chain = %chain.name, url = %chain.rpc_url, "EVM client created");
        Ok(self
            .evm
            .entry(chain.name.clone())
            .or_insert(client)
            .clone())
    }

    fn utxo(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn UtxoIndexer>> {
        expect_family(chain, ChainFamily::Btc)?;
        if let Some(client) = self.utxo.get(&chain.name) {
            return Ok(client.clone());
        }
        let client: Arc<dyn UtxoIndexer> =
            Arc::new(EsploraClient::new(&chain.rpc_url, self.btc_timeout)?);
        Ok(self
            .utxo
            .entry(chain.name.clone())
            .or_insert(client)
            .clone())
    }

    fn solana(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn SolanaRpc>> {
        expect_family(chain, ChainFamily::Sol)?;
        if let Some(client) = self.solana.get(&chain.name) {
            return Ok(client.clone());
        }
        let client: Arc<dyn SolanaRpc> = Arc::new(SolanaRpcClient::new(
            &chain.rpc_url,
            &self.commitment,
            self.sol_timeout,
        )?);
        Ok(self
            .solana
            .entry(chain.name.clone())
            .or_insert(client)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;
    use crate::config::schema::default_chains;

    #[test]
    fn test_clients_are_cached_per_chain() {
        let config = EngineConfig::default();
        let registry = ChainRegistry::new(&default_chains());
        let backends = LiveBackends::new(&config);

        let bsc = registry.resolve("BSC").unwrap();
        let a = backends.evm(bsc).unwrap();
        let b = backends.evm(bsc).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_family_mismatch_is_rejected() {
        let config = EngineConfig::default();
        let registry = ChainRegistry::new(&default_chains());
        let backends = LiveBackends::new(&config);

        let btc = registry.resolve("BTC-TestNet").unwrap();
        assert!(matches!(backends.evm(btc), Err(EngineError::UnsupportedChain(_))));
        assert!(backends.utxo(btc).is_ok());
    }
}
