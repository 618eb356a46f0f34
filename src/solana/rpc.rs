//! Solana JSON-RPC client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::broadcast::TxSubmitter;
use crate::error::{EngineError, EngineResult};
use crate::observability::metrics;
use crate::transaction::SignedTransaction;

/// The Solana RPC calls the engine makes.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn latest_blockhash(&self) -> EngineResult<[u8; 32]>;

    /// Submit wire bytes; returns the signature the node reports.
    async fn send_transaction(&self, wire: &[u8]) -> EngineResult<String>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client for one cluster endpoint.
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: reqwest::Client,
    url: String,
    commitment: String,
}

impl SolanaRpcClient {
    pub fn new(url: &str, commitment: &str, timeout: Duration) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::RpcUnavailable(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            url: url.to_string(),
            commitment: commitment.to_string(),
        })
    }

    async fn request(&self, method: &'static str, params: Value) -> EngineResult<Value> {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unavailable(method, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(method, format!("HTTP {}", status)));
        }
        let parsed: RpcResponse = response.json().await.map_err(|e| self.unavailable(method, e))?;
        if let Some(error) = parsed.error {
            return Err(self.unavailable(method, format!("{} (code {})", error.message, error.code)));
        }
        parsed
            .result
            .ok_or_else(|| self.unavailable(method, "response has no result"))
    }

    fn unavailable(&self, method: &str, e: impl std::fmt::Display) -> EngineError {
        metrics::record_rpc_failure("sol");
        tracing::warn!(url = %self.url, method, error = %e, "Solana RPC call failed");
        EngineError::RpcUnavailable(format!("{}: {}", method, e))
    }
}

#[async_trait]
impl SolanaRpc for SolanaRpcClient {
    async fn latest_blockhash(&self) -> EngineResult<[u8; 32]> {
        let result = self
            .request("getLatestBlockhash", json!([{"commitment": self.commitment}]))
            .await?;
        let encoded = result["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| self.unavailable("getLatestBlockhash", "missing blockhash"))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| self.unavailable("getLatestBlockhash", e))?;
        bytes
            .try_into()
            .map_err(|_| self.unavailable("getLatestBlockhash", "blockhash is not 32 bytes"))
    }

    async fn send_transaction(&self, wire: &[u8]) -> EngineResult<String> {
        let result = self
            .request(
                "sendTransaction",
                json!([
                    BASE64.encode(wire),
                    {"encoding": "base64", "preflightCommitment": "confirmed"}
                ]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.unavailable("sendTransaction", "result is not a signature"))
    }
}

/// Submits signed Solana transactions through a `SolanaRpc`.
pub struct SolanaSubmitter {
    rpc: Arc<dyn SolanaRpc>,
}

impl SolanaSubmitter {
    pub fn new(rpc: Arc<dyn SolanaRpc>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl TxSubmitter for SolanaSubmitter {
    async fn submit(&self, tx: &SignedTransaction) -> EngineResult<String> {
        self.rpc.send_transaction(&tx.raw).await
    }
}
