//! HTTP client for the LI.FI API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::aggregator::types::{BridgeStatus, Quote, QuoteKind, QuoteRequest};
use crate::config::AggregatorConfig;
use crate::error::{EngineError, EngineResult};

/// Route aggregator operations used by the orchestrator.
#[async_trait]
pub trait RouteAggregator: Send + Sync {
    /// Fetch an executable quote. `solana` selects the payload shape to validate.
    async fn quote(&self, request: &QuoteRequest, solana: bool) -> EngineResult<Quote>;

    async fn status(
        &self,
        tx_hash: &str,
        from_chain: Option<u64>,
        to_chain: Option<u64>,
    ) -> EngineResult<BridgeStatus>;

    async fn chains(&self) -> EngineResult<Value>;

    async fn tokens(&self, chains: &[u64]) -> EngineResult<Value>;
}

/// Query string for `GET /quote`.
pub fn quote_query(request: &QuoteRequest, config: &AggregatorConfig) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("fromChain", request.from_chain.to_string()),
        ("toChain", request.to_chain.to_string()),
        ("fromToken", request.from_token.clone()),
        ("toToken", request.to_token.clone()),
        ("fromAmount", request.from_amount.clone()),
        ("fromAddress", request.from_address.clone()),
    ];
    if let Some(to) = request.to_address.as_ref().filter(|a| !a.is_empty()) {
        query.push(("toAddress", to.clone()));
    }
    query.push(("integrator", config.integrator.clone()));
    query.push((
        "order",
        request
            .order
            .clone()
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| config.default_order.clone()),
    ));
    query.push((
        "slippage",
        request
            .slippage
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config.default_slippage.clone()),
    ));
    query.push(("skipSimulation", "false".to_string()));
    query.push(("allowSwitchChain", "false".to_string()));
    query.push(("routeTimingStrategies", config.timing_strategy.clone()));
    let step = match request.kind {
        QuoteKind::Swap => "swapStepTimingStrategies",
        QuoteKind::Bridge => "bridgeStepTimingStrategies",
    };
    query.push((step, config.timing_strategy.clone()));
    query
}

/// LI.FI REST client.
#[derive(Debug, Clone)]
pub struct LifiClient {
    http: reqwest::Client,
    config: AggregatorConfig,
}

impl LifiClient {
    pub fn new(config: &AggregatorConfig) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| EngineError::Aggregator {
                status: 0,
                body: format!("http client: {}", e),
            })?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> EngineResult<Value> {
        let url = self.url(path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Aggregator request failed");
                EngineError::Aggregator {
                    status: 0,
                    body: e.to_string(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), body = %body, "Aggregator returned error");
            return Err(EngineError::Aggregator {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Value>().await.map_err(|e| EngineError::Aggregator {
            status: status.as_u16(),
            body: format!("invalid JSON: {}", e),
        })
    }
}

#[async_trait]
impl RouteAggregator for LifiClient {
    async fn quote(&self, request: &QuoteRequest, solana: bool) -> EngineResult<Quote> {
        let query = quote_query(request, &self.config);
        tracing::debug!(
            from_chain = request.from_chain,
            to_chain = request.to_chain,
            from_token = %request.from_token,
            to_token = %request.to_token,
            amount = %request.from_amount,
            "Requesting quote"
        );
        let body = self.get_json("quote", &query).await?;
        let quote = Quote::from_response(body, solana)?;
        tracing::info!(
            quote_id = %quote.id,
            tool = %quote.tool,
            to_amount = %quote.to_amount,
            "Quote received"
        );
        Ok(quote)
    }

    async fn status(
        &self,
        tx_hash: &str,
        from_chain: Option<u64>,
        to_chain: Option<u64>,
    ) -> EngineResult<BridgeStatus> {
        let mut query = vec![("txHash", tx_hash.to_string())];
        if let Some(id) = from_chain {
            query.push(("fromChain", id.to_string()));
        }
        if let Some(id) = to_chain {
            query.push(("toChain", id.to_string()));
        }
        let body = self.get_json("status", &query).await?;
        Ok(BridgeStatus::from_response(&body))
    }

    async fn chains(&self) -> EngineResult<Value> {
        self.get_json("chains", &[]).await
    }

    async fn tokens(&self, chains: &[u64]) -> EngineResult<Value> {
        let mut query = Vec::new();
        if !chains.is_empty() {
            let joined = chains
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            query.push(("chains", joined));
        }
        self.get_json("tokens", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: QuoteKind) -> QuoteRequest {
        QuoteRequest {
            kind,
            from_chain: 56,
            to_chain: 42161,
            from_token: "0x0000000000000000000000000000000000000000".to_string(),
            to_token: "0xaf88d065e77c8cC2239327C5EDb3A432268e5831".to_string(),
            from_amount: "1000000000000000000".to_string(),
            from_address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            to_address: None,
            order: None,
            slippage: Some("0.01".to_string()),
        }
    }

    fn value<'a>(query: &'a [(&str, String)], key: &str) -> Option<&'a str> {
        query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_quote_query_defaults_and_overrides() {
        let config = AggregatorConfig::default();
        let query = quote_query(&request(QuoteKind::Bridge), &config);
        assert_eq!(value(&query, "order"), Some("FASTEST"));
        assert_eq!(value(&query, "slippage"), Some("0.01"));
        assert_eq!(value(&query, "toAddress"), None);
        assert_eq!(value(&query, "skipSimulation"), Some("false"));
        assert_eq!(value(&query, "allowSwitchChain"), Some("false"));
        assert_eq!(value(&query, "bridgeStepTimingStrategies"), Some("minWaitTime-600-4-300"));
        assert_eq!(value(&query, "swapStepTimingStrategies"), None);
        assert_eq!(value(&query, "integrator"), Some(config.integrator.as_str()));
    }

    #[test]
    fn test_swap_query_uses_swap_timing() {
        let mut req = request(QuoteKind::Swap);
        req.to_address = Some("0x000000000000000000000000000000000000dEaD".to_string());
        let query = quote_query(&req, &AggregatorConfig::default());
        assert_eq!(value(&query, "swapStepTimingStrategies"), Some("minWaitTime-600-4-300"));
        assert_eq!(value(&query, "routeTimingStrategies"), Some("minWaitTime-600-4-300"));
        assert!(value(&query, "toAddress").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_aggregator_error() {
        let config = AggregatorConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            ..AggregatorConfig::default()
        };
        let client = LifiClient::new(&config).unwrap();
        let err = client.chains().await.unwrap_err();
        assert!(matches!(err, EngineError::Aggregator { status: 0, .. }));
    }
}
