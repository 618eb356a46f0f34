//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::chains::ChainFamily;

/// Root configuration for the transaction engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain registry entries. Replaces the built-in list when present.
    pub chains: Vec<ChainEntry>,

    /// Swap/bridge aggregator settings.
    pub aggregator: AggregatorConfig,

    /// EVM RPC settings shared by all EVM chains.
    pub evm: EvmConfig,

    /// Allowance check and approve-wait settings.
    pub allowance: AllowanceConfig,

    /// Bridge status polling.
    pub bridge: BridgeConfig,

    /// Bitcoin builder settings.
    pub btc: BtcConfig,

    /// Solana builder settings.
    pub solana: SolanaConfig,

    /// Background broadcast dispatcher.
    pub broadcast: BroadcastConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            aggregator: AggregatorConfig::default(),
            evm: EvmConfig::default(),
            allowance: AllowanceConfig::default(),
            bridge: BridgeConfig::default(),
            btc: BtcConfig::default(),
            solana: SolanaConfig::default(),
            broadcast: BroadcastConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// One chain the engine can transact on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainEntry {
    /// Canonical chain name used in requests (e.g., "BSC").
    pub name: String,

    /// Alternative spellings accepted in requests.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Ledger family.
    pub family: ChainFamily,

    /// JSON-RPC endpoint (EVM, Solana) or indexer base URL (BTC).
    pub rpc_url: String,

    /// Failover endpoints tried in order after the primary.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// EIP-155 chain id. Required for EVM chains.
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Chain id understood by the aggregator. Defaults to `chain_id`.
    #[serde(default)]
    pub aggregator_chain_id: Option<u64>,

    /// Testnets are not routed through the aggregator.
    #[serde(default)]
    pub testnet: bool,

    /// Explorer prefix; the transaction id is appended.
    #[serde(default)]
    pub explorer_tx_url: Option<String>,

    /// Explorer suffix appended after the transaction id (e.g., "?cluster=devnet").
    #[serde(default)]
    pub explorer_suffix: Option<String>,

    /// UniswapV2-style router used for testnet swaps.
    #[serde(default)]
    pub dex_router: Option<String>,

    /// Wrapped native token paired with `dex_router`.
    #[serde(default)]
    pub wrapped_native: Option<String>,
}

impl ChainEntry {
    fn evm(name: &str, chain_id: u64, rpc_url: &str, explorer: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            family: ChainFamily::Evm,
            rpc_url: rpc_url.to_string(),
            failover_urls: Vec::new(),
            chain_id: Some(chain_id),
            aggregator_chain_id: None,
            testnet: false,
            explorer_tx_url: Some(explorer.to_string()),
            explorer_suffix: None,
            dex_router: None,
            wrapped_native: None,
        }
    }

    fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    fn testnet(mut self) -> Self {
        self.testnet = true;
        self
    }
}

/// Built-in chain list.
pub fn default_chains() -> Vec<ChainEntry> {
    let mut bsc_testnet = ChainEntry::evm(
        "BSC-TestNet",
        97,
        "https://data-seed-prebsc-1-s1.binance.org:8545",
        "https://testnet.bscscan.com/tx/",
    )
    .with_aliases(&["BSC-Testnet", "bsc-testnet"])
    .testnet();
    // PancakeSwap V2 router and WBNB on BSC testnet
    bsc_testnet.dex_router = Some("0xD99D1c33F9fC3444f8101754aBeCb321741Da593".to_string());
    bsc_testnet.wrapped_native = Some("0xae13d989daC2f0dEbFf460aC112a837C89BAa7cd".to_string());

    vec![
        ChainEntry::evm(
            "ETH",
            1,
            "https://eth.llamarpc.com",
            "https://etherscan.io/tx/",
        )
        .with_aliases(&["Ethereum"]),
        ChainEntry::evm(
            "ETH-Sepolia",
            11155111,
            "https://rpc.sepolia.org",
            "https://sepolia.etherscan.io/tx/",
        )
        .with_aliases(&["Sepolia"])
        .testnet(),
        ChainEntry::evm(
            "BSC",
            56,
            "https://bsc-dataseed.binance.org",
            "https://bscscan.com/tx/",
        ),
        bsc_testnet,
        ChainEntry::evm(
            "Polygon",
            137,
            "https://polygon-rpc.com",
            "https://polygonscan.com/tx/",
        ),
        ChainEntry::evm(
            "Arbitrum",
            42161,
            "https://arb1.arbitrum.io/rpc",
            "https://arbiscan.io/tx/",
        ),
        ChainEntry::evm(
            "Optimism",
            10,
            "https://mainnet.optimism.io",
            "https://optimistic.etherscan.io/tx/",
        ),
        ChainEntry::evm(
            "Base",
            8453,
            "https://mainnet.base.org",
            "https://basescan.org/tx/",
        ),
        ChainEntry {
            name: "Solana".to_string(),
            aliases: vec!["SOL".to_string()],
            family: ChainFamily::Sol,
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            aggregator_chain_id: Some(SOLANA_AGGREGATOR_CHAIN_ID),
            testnet: false,
            explorer_tx_url: Some("https://solscan.io/tx/".to_string()),
            explorer_suffix: None,
            dex_router: None,
            wrapped_native: None,
        },
        ChainEntry {
            name: "Solana-TestNet".to_string(),
            aliases: vec!["Solana-Devnet".to_string(), "SOL-TestNet".to_string()],
            family: ChainFamily::Sol,
            rpc_url: "https://api.devnet.solana.com".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            aggregator_chain_id: None,
            testnet: true,
            explorer_tx_url: Some("https://solscan.io/tx/".to_string()),
            explorer_suffix: Some("?cluster=devnet".to_string()),
            dex_router: None,
            wrapped_native: None,
        },
        ChainEntry {
            name: "BTC-TestNet".to_string(),
            aliases: vec!["BTC".to_string(), "Bitcoin-TestNet".to_string()],
            family: ChainFamily::Btc,
            rpc_url: "https://blockstream.info/testnet/api".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            aggregator_chain_id: None,
            testnet: true,
            explorer_tx_url: Some("https://mempool.space/testnet/tx/".to_string()),
            explorer_suffix: None,
            dex_router: None,
            wrapped_native: None,
        },
    ]
}

/// Aggregator chain id for Solana mainnet.
pub const SOLANA_AGGREGATOR_CHAIN_ID: u64 = 1151111081099710;

/// Swap/bridge aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Base URL of the aggregator API.
    pub api_url: String,

    /// Integrator tag sent with every quote.
    pub integrator: String,

    /// User-Agent header value.
    pub user_agent: String,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// Route ordering when the request has none.
    pub default_order: String,

    /// Slippage tolerance when the request has none, as a decimal fraction string.
    pub default_slippage: String,

    /// Timing strategy applied to routes and steps.
    pub timing_strategy: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://li.quest/v1".to_string(),
            integrator: "custody-engine".to_string(),
            user_agent: "custody-engine/0.1".to_string(),
            timeout_secs: 30,
            default_order: "FASTEST".to_string(),
            default_slippage: "0.005".to_string(),
            timing_strategy: "minWaitTime-600-4-300".to_string(),
        }
    }
}

/// EVM RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvmConfig {
    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 10,
        }
    }
}

/// Allowance manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AllowanceConfig {
    /// Attempts for each allowance read.
    pub check_attempts: u32,

    /// Linear backoff base between allowance reads, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Receipt poll interval while waiting for an approve, in seconds.
    pub receipt_poll_secs: u64,

    /// Give up waiting for an approve receipt after this many seconds.
    pub receipt_timeout_secs: u64,
}

impl Default for AllowanceConfig {
    fn default() -> Self {
        Self {
            check_attempts: 3,
            retry_base_delay_ms: 1000,
            receipt_poll_secs: 3,
            receipt_timeout_secs: 60,
        }
    }
}

/// Bridge status polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Seconds between status queries.
    pub status_poll_interval_secs: u64,

    /// Status queries before reporting TIMEOUT.
    pub status_max_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            status_poll_interval_secs: 15,
            status_max_attempts: 10,
        }
    }
}

/// Bitcoin builder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BtcConfig {
    /// Flat fee per transaction in satoshis.
    pub fee_sats: u64,

    /// Indexer request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BtcConfig {
    fn default() -> Self {
        Self {
            fee_sats: 5000,
            request_timeout_secs: 30,
        }
    }
}

/// Solana builder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolanaConfig {
    /// Continue with a placeholder blockhash and return the local signature
    /// when the RPC is unreachable.
    pub degraded_mode: bool,

    /// Commitment used for blockhash queries.
    pub commitment: String,

    /// RPC request timeout in seconds.
    pub request_timeout_secs: u64,

    /// DEX program targeted by the swap instruction skeleton.
    pub swap_program_id: String,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            degraded_mode: false,
            commitment: "finalized".to_string(),
            request_timeout_secs: 30,
            // Raydium AMM v4
            swap_program_id: "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string(),
        }
    }
}

/// Broadcast dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Submission attempts per signed transaction.
    pub max_attempts: u32,

    /// Linear backoff base between attempts, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Detached submissions allowed to run at once.
    pub max_in_flight: usize,

    /// How long the CLI waits for detached submissions before exiting.
    pub drain_timeout_secs: u64,

    /// Finished outcomes kept for lookup; the oldest are evicted first.
    pub outcome_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            max_in_flight: 256,
            drain_timeout_secs: 30,
            outcome_capacity: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_cover_all_families() {
        let chains = default_chains();
        assert!(chains.iter().any(|c| c.family == ChainFamily::Evm));
        assert!(chains.iter().any(|c| c.family == ChainFamily::Btc));
        assert!(chains.iter().any(|c| c.family == ChainFamily::Sol));
        let bsc = chains.iter().find(|c| c.name == "BSC").unwrap();
        assert_eq!(bsc.chain_id, Some(56));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [btc]
            fee_sats = 7500

            [bridge]
            status_max_attempts = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.btc.fee_sats, 7500);
        assert_eq!(config.btc.request_timeout_secs, 30);
        assert_eq!(config.bridge.status_max_attempts, 4);
        assert_eq!(config.bridge.status_poll_interval_secs, 15);
        assert_eq!(config.chains.len(), default_chains().len());
    }

    #[test]
    fn test_chain_table_parsing() {
        let config: EngineConfig = toml::from_str(
            r#"
            [[chains]]
            name = "Anvil"
            family = "EVM"
            rpc_url = "http://127.0.0.1:8545"
            chain_id = 31337
            "#,
        )
        .unwrap();
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].family, ChainFamily::Evm);
        assert!(config.chains[0].aliases.is_empty());
        assert!(!config.chains[0].testnet);
    }
}
