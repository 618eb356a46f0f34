//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use custody_engine::aggregator::{BridgeStatus, Quote, QuoteRequest, RouteAggregator};
use custody_engine::btc::UtxoIndexer;
use custody_engine::chains::{ChainConfig, ChainRegistry};
use custody_engine::config::schema::default_chains;
use custody_engine::engine::ChainBackends;
use custody_engine::evm::abi::{ALLOWANCE_SELECTOR, APPROVE_SELECTOR};
use custody_engine::evm::EvmRpc;
use custody_engine::keys::{KeyMaterial, StaticKeyProvider};
use custody_engine::solana::{SolanaKeypair, SolanaRpc};
use custody_engine::{EngineConfig, EngineError, EngineResult, TransactionEngine};

/// Anvil's first account.
pub const EVM_KEY_HEX: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const EVM_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const USDT_BSC: &str = "0x55d398326f99059fF775485246999027B3197955";
pub const LIFI_DIAMOND: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";

pub const SOL_SEED: [u8; 32] = [7u8; 32];

pub fn sol_address() -> String {
    SolanaKeypair::from_key(&KeyMaterial::from_bytes(SOL_SEED.to_vec()))
        .unwrap()
        .pubkey()
        .to_string()
}

pub fn evm_key() -> Vec<u8> {
    hex::decode(EVM_KEY_HEX).unwrap()
}

/// A request as seen by the mock HTTP server.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    pub body: String,
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(MockRequest {
        method,
        target,
        body,
    })
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

type AllowanceKey = (Address, Address, Address);

/// In-memory EVM node. Decodes submitted transactions and applies `approve` calls.
pub struct MockEvmRpc {
    pub chain_id: u64,
    pub gas_price: u128,
    pub calls: AtomicUsize,
    pub fail_sends: AtomicU32,
    base_nonce: AtomicU64,
    code: Mutex<HashMap<Address, Bytes>>,
    allowances: Mutex<HashMap<AllowanceKey, U256>>,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockEvmRpc {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_price: 3_000_000_000,
            calls: AtomicUsize::new(0),
            fail_sends: AtomicU32::new(0),
            base_nonce: AtomicU64::new(7),
            code: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.code.lock().unwrap().insert(address, code);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances
            .lock()
            .unwrap()
            .insert((token, owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .lock()
            .unwrap()
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn decoded(&self) -> Vec<TxEnvelope> {
        self.submitted()
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap())
            .collect()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn word_address(word: &[u8]) -> Address {
    Address::from_slice(&word[12..32])
}

#[async_trait]
impl EvmRpc for MockEvmRpc {
    async fn chain_id(&self) -> EngineResult<u64> {
        self.touch();
        Ok(self.chain_id)
    }

    async fn pending_nonce(&self, _address: Address) -> EngineResult<u64> {
        self.touch();
        Ok(self.base_nonce.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> EngineResult<u128> {
        self.touch();
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> EngineResult<u64> {
        self.touch();
        Ok(50_000)
    }

    async fn code_at(&self, address: Address) -> EngineResult<Bytes> {
        self.touch();
        Ok(self.code.lock().unwrap().get(&address).cloned().unwrap_or_default())
    }

    async fn call(&self, tx: &TransactionRequest) -> EngineResult<Bytes> {
        self.touch();
        let input = tx.input.input().cloned().unwrap_or_default();
        let token = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        if input.len() >= 68 && input[..4] == ALLOWANCE_SELECTOR {
            let owner = word_address(&input[4..36]);
            let spender = word_address(&input[36..68]);
            let amount = self.allowance(token, owner, spender);
            return Ok(Bytes::from(amount.to_be_bytes::<32>().to_vec()));
        }
        Ok(Bytes::new())
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> EngineResult<TxHash> {
        self.touch();
        if self
            .fail_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EngineError::RpcUnavailable("connection reset".to_string()));
        }

        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| EngineError::RpcUnavailable(format!("undecodable: {}", e)))?;
        let signer = envelope
            .recover_signer()
            .map_err(|e| EngineError::RpcUnavailable(format!("bad signature: {}", e)))?;
        let input = envelope.input();
        if input.len() >= 68 && input[..4] == APPROVE_SELECTOR {
            if let Some(token) = envelope.to() {
                let spender = word_address(&input[4..36]);
                let amount = U256::from_be_slice(&input[36..68]);
                self.set_allowance(token, signer, spender, amount);
            }
        }

        self.base_nonce.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(raw.to_vec());
        Ok(*envelope.tx_hash())
    }

    async fn receipt_status(&self, tx_hash: TxHash) -> EngineResult<Option<bool>> {
        self.touch();
        let known = self.decoded().iter().any(|tx| *tx.tx_hash() == tx_hash);
        Ok(known.then_some(true))
    }
}

/// Backends that count every lookup.
pub struct MockBackends {
    pub evm: Arc<MockEvmRpc>,
    pub utxo: Option<Arc<dyn UtxoIndexer>>,
    pub solana: Option<Arc<dyn SolanaRpc>>,
    pub lookups: AtomicUsize,
}

impl MockBackends {
    pub fn new(evm: Arc<MockEvmRpc>) -> Self {
        Self {
            evm,
            utxo: None,
            solana: None,
            lookups: AtomicUsize::new(0),
        }
    }
}

impl ChainBackends for MockBackends {
    fn evm(&self, _chain: &ChainConfig) -> EngineResult<Arc<dyn EvmRpc>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.evm.clone())
    }

    fn utxo(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn UtxoIndexer>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.utxo
            .clone()
            .ok_or_else(|| EngineError::UnsupportedChain(chain.name.clone()))
    }

    fn solana(&self, chain: &ChainConfig) -> EngineResult<Arc<dyn SolanaRpc>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.solana
            .clone()
            .ok_or_else(|| EngineError::UnsupportedChain(chain.name.clone()))
    }
}

/// Aggregator returning a canned quote and a scripted sequence of statuses.
pub struct MockAggregator {
    pub quote_body: Value,
    pub quotes: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub last_request: Mutex<Option<QuoteRequest>>,
    statuses: Mutex<VecDeque<EngineResult<BridgeStatus>>>,
}

impl MockAggregator {
    pub fn new(quote_body: Value) -> Self {
        Self {
            quote_body,
            quotes: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_status(&self, status: EngineResult<BridgeStatus>) {
        self.statuses.lock().unwrap().push_back(status);
    }
}

pub fn status(value: &str) -> BridgeStatus {
    BridgeStatus::from_response(&json!({ "status": value }))
}

#[async_trait]
impl RouteAggregator for MockAggregator {
    async fn quote(&self, request: &QuoteRequest, solana: bool) -> EngineResult<Quote> {
        self.quotes.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Quote::from_response(self.quote_body.clone(), solana)
    }

    async fn status(
        &self,
        _tx_hash: &str,
        _from_chain: Option<u64>,
        _to_chain: Option<u64>,
    ) -> EngineResult<BridgeStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(status("PENDING")))
    }

    async fn chains(&self) -> EngineResult<Value> {
        Ok(json!({ "chains": [{ "id": 56, "key": "bsc" }] }))
    }

    async fn tokens(&self, _chains: &[u64]) -> EngineResult<Value> {
        Ok(json!({ "tokens": {} }))
    }
}

/// EVM quote calling the LI.FI diamond.
pub fn evm_quote_body() -> Value {
    json!({
        "tool": "pancakeswap",
        "action": { "fromChainId": 56, "toChainId": 56 },
        "estimate": {
            "approvalAddress": LIFI_DIAMOND,
            "fromAmount": "1000000",
            "toAmount": "998000",
            "toAmountMin": "993010"
        },
        "transactionRequest": {
            "to": LIFI_DIAMOND,
            "data": "0x4630a0d8deadbeef",
            "value": "0x0",
            "gasLimit": "0x61a80",
            "gasPrice": "0x3b9aca00"
        }
    })
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.broadcast.retry_base_delay_ms = 10;
    config.allowance.retry_base_delay_ms = 10;
    config
}

pub fn engine_with(
    config: EngineConfig,
    backends: Arc<MockBackends>,
    aggregator: Arc<MockAggregator>,
) -> TransactionEngine {
    let keys = StaticKeyProvider::new()
        .with_key(EVM_ADDRESS, evm_key())
        .with_key(&sol_address(), SOL_SEED.to_vec());
    TransactionEngine::new(
        config,
        ChainRegistry::new(&default_chains()),
        Arc::new(keys),
        aggregator,
        backends,
    )
}

pub fn engine(backends: Arc<MockBackends>, aggregator: Arc<MockAggregator>) -> TransactionEngine {
    engine_with(test_config(), backends, aggregator)
}

pub const DRAIN: Duration = Duration::from_secs(5);
