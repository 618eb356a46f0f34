//! Esplora-compatible UTXO indexer client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::broadcast::TxSubmitter;
use crate::btc::address::parse_testnet_address;
use crate::error::{EngineError, EngineResult};
use crate::observability::metrics;
use crate::transaction::SignedTransaction;

/// An unspent output owned by the source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value_sats: u64,
    /// Hex of the output script being spent.
    pub script_pubkey_hex: String,
    pub confirmed: bool,
}

/// UTXO lookup and raw transaction submission.
#[async_trait]
pub trait UtxoIndexer: Send + Sync {
    async fn utxos(&self, address: &str) -> EngineResult<Vec<Utxo>>;

    /// Submit a hex-encoded transaction; returns the txid the indexer reports.
    async fn broadcast(&self, raw_hex: &str) -> EngineResult<String>;
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    #[serde(default)]
    status: EsploraStatus,
}

#[derive(Debug, Default, Deserialize)]
struct EsploraStatus {
    #[serde(default)]
    confirmed: bool,
}

/// HTTP client for an Esplora API (blockstream.info, mempool.space).
#[derive(Debug, Clone)]
pub struct EsploraClient {
    http: reqwest::Client,
    base_url: String,
}

impl EsploraClient {
    pub fn new(base_url: &str, timeout: Duration) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::RpcUnavailable(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn unavailable(&self, e: impl std::fmt::Display) -> EngineError {
        metrics::record_rpc_failure("btc");
        EngineError::RpcUnavailable(format!("{}: {}", self.base_url, e))
    }
}

#[async_trait]
impl UtxoIndexer for EsploraClient {
    async fn utxos(&self, address: &str) -> EngineResult<Vec<Utxo>> {
        let script = parse_testnet_address(address)?.script_pubkey();
        let script_pubkey_hex = hex::encode(script.as_bytes());

        let url = format!("{}/address/{}/utxo", self.base_url, address);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("utxo lookup returned {}: {}", status, body)));
        }
        let entries: Vec<EsploraUtxo> = response.json().await.map_err(|e| self.unavailable(e))?;

        tracing::debug!(address = %address, count = entries.len(), "Fetched UTXOs");
        Ok(entries
            .into_iter()
            .map(|u| Utxo {
                txid: u.txid,
                vout: u.vout,
                value_sats: u.value,
                script_pubkey_hex: script_pubkey_hex.clone(),
                confirmed: u.status.confirmed,
            })
            .collect())
    }

    async fn broadcast(&self, raw_hex: &str) -> EngineResult<String> {
        let url = format!("{}/tx", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(raw_hex.to_string())
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.unavailable(e))?;
        if !status.is_success() {
            return Err(self.unavailable(format!("broadcast returned {}: {}", status, body.trim())));
        }
        Ok(body.trim().to_string())
    }
}

/// Submits signed BTC transactions through an indexer.
pub struct BtcSubmitter {
    indexer: Arc<dyn UtxoIndexer>,
}

impl BtcSubmitter {
    pub fn new(indexer: Arc<dyn UtxoIndexer>) -> Self {
        Self { indexer }
    }
}

#[async_trait]
impl TxSubmitter for BtcSubmitter {
    async fn submit(&self, tx: &SignedTransaction) -> EngineResult<String> {
        self.indexer.broadcast(&tx.raw_hex()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esplora_entry_shape() {
        let json = r#"[
            {"txid":"aa","vout":1,"status":{"confirmed":true,"block_height":10},"value":15000},
            {"txid":"bb","vout":0,"status":{"confirmed":false},"value":900}
        ]"#;
        let entries: Vec<EsploraUtxo> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].status.confirmed);
        assert_eq!(entries[0].value, 15_000);
        assert!(!entries[1].status.confirmed);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            EsploraClient::new("https://blockstream.info/testnet/api/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url, "https://blockstream.info/testnet/api");
    }

    #[tokio::test]
    async fn test_invalid_address_fails_before_request() {
        let client = EsploraClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = client.utxos("not-an-address").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddress(_)));
    }
}
