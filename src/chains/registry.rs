//! Static chain registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chains::explorer;
use crate::config::schema::ChainEntry;
use crate::error::{EngineError, EngineResult};

/// Ledger family. Decides which builder handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainFamily {
    /// Account-model chains speaking Ethereum JSON-RPC.
    Evm,
    /// Bitcoin UTXO model.
    Btc,
    /// Solana instruction model.
    Sol,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Btc => "btc",
            ChainFamily::Sol => "sol",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network parameters for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub name: String,
    pub family: ChainFamily,
    pub rpc_url: String,
    pub failover_urls: Vec<String>,
    /// EIP-155 chain id (EVM only).
    pub chain_id: Option<u64>,
    aggregator_chain_id: Option<u64>,
    pub testnet: bool,
    explorer_tx_url: Option<String>,
    explorer_suffix: Option<String>,
    pub dex_router: Option<String>,
    pub wrapped_native: Option<String>,
}

impl ChainConfig {
    /// Chain id sent to the aggregator, if the aggregator covers this chain.
    pub fn aggregator_chain_id(&self) -> Option<u64> {
        self.aggregator_chain_id.or(if self.testnet { None } else { self.chain_id })
    }

    /// EIP-155 chain id, or `UnsupportedChain` for non-EVM entries.
    pub fn evm_chain_id(&self) -> EngineResult<u64> {
        match (self.family, self.chain_id) {
            (ChainFamily::Evm, Some(id)) => Ok(id),
            _ => Err(EngineError::UnsupportedChain(format!(
                "{} has no EVM chain id",
                self.name
            ))),
        }
    }

    /// Explorer link for a transaction on this chain.
    pub fn explorer_url(&self, tx_id: &str) -> String {
        explorer::explorer_url(
            self.explorer_tx_url.as_deref(),
            self.explorer_suffix.as_deref(),
            tx_id,
        )
    }
}

impl From<&ChainEntry> for ChainConfig {
    fn from(entry: &ChainEntry) -> Self {
        Self {
            name: entry.name.clone(),
            family: entry.family,
            rpc_url: entry.rpc_url.clone(),
            failover_urls: entry.failover_urls.clone(),
            chain_id: entry.chain_id,
            aggregator_chain_id: entry.aggregator_chain_id,
            testnet: entry.testnet,
            explorer_tx_url: entry.explorer_tx_url.clone(),
            explorer_suffix: entry.explorer_suffix.clone(),
            dex_router: entry.dex_router.clone(),
            wrapped_native: entry.wrapped_native.clone(),
        }
    }
}

/// Lookup table from chain name, alias, or id to `ChainConfig`.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
    by_name: HashMap<String, usize>,
}

impl ChainRegistry {
    /// Build the registry from validated config entries.
    ///
    /// Later duplicates are ignored with a warning; `validate_config`
    /// rejects them before this point in normal startup.
    pub fn new(entries: &[ChainEntry]) -> Self {
        let mut chains = Vec::with_capacity(entries.len());
        let mut by_name = HashMap::new();

        for entry in entries {
            let idx = chains.len();
            chains.push(ChainConfig::from(entry));
            for name in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
                let key = name.to_ascii_lowercase();
                if by_name.contains_key(&key) {
                    tracing::warn!(chain = %entry.name, name = %name, "Duplicate chain name ignored");
                    continue;
                }
                by_name.insert(key, idx);
            }
        }

        Self { chains, by_name }
    }

    /// Resolve a chain by name or alias.
    pub fn resolve(&self, name: &str) -> EngineResult<&ChainConfig> {
        self.by_name
            .get(&name.trim().to_ascii_lowercase())
            .map(|&idx| &self.chains[idx])
            .ok_or_else(|| EngineError::UnsupportedChain(name.to_string()))
    }

    /// Resolve a chain by the id the aggregator uses for it.
    pub fn by_aggregator_id(&self, id: u64) -> EngineResult<&ChainConfig> {
        self.chains
            .iter()
            .find(|c| c.aggregator_chain_id() == Some(id))
            .or_else(|| self.chains.iter().find(|c| c.chain_id == Some(id)))
            .ok_or_else(|| EngineError::UnsupportedChain(format!("chain id {}", id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(&crate::config::schema::default_chains())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SOLANA_AGGREGATOR_CHAIN_ID;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = ChainRegistry::default();
        assert_eq!(registry.resolve("bsc").unwrap().chain_id, Some(56));
        assert_eq!(registry.resolve(" BSC ").unwrap().name, "BSC");
        assert_eq!(registry.resolve("sol").unwrap().family, ChainFamily::Sol);
    }

    #[test]
    fn test_unknown_chain() {
        let registry = ChainRegistry::default();
        let err = registry.resolve("Dogecoin").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedChain(_)));
    }

    #[test]
    fn test_aggregator_ids() {
        let registry = ChainRegistry::default();
        assert_eq!(registry.by_aggregator_id(56).unwrap().name, "BSC");
        assert_eq!(
            registry.by_aggregator_id(SOLANA_AGGREGATOR_CHAIN_ID).unwrap().name,
            "Solana"
        );
        // testnets are not aggregator chains but still resolve by EIP-155 id
        let bsc_testnet = registry.resolve("BSC-TestNet").unwrap();
        assert_eq!(bsc_testnet.aggregator_chain_id(), None);
        assert_eq!(registry.by_aggregator_id(97).unwrap().name, "BSC-TestNet");
    }

    #[test]
    fn test_evm_chain_id_rejects_other_families() {
        let registry = ChainRegistry::default();
        assert!(registry.resolve("BTC-TestNet").unwrap().evm_chain_id().is_err());
        assert_eq!(registry.resolve("ETH").unwrap().evm_chain_id().unwrap(), 1);
    }

    #[test]
    fn test_family_serde_names() {
        let json = serde_json::to_string(&ChainFamily::Sol).unwrap();
        assert_eq!(json, "\"SOL\"");
    }
}
