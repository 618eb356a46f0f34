//! Cross-chain quote, execution and status polling.

use std::time::Duration;

use crate::aggregator::types::STATUS_TIMEOUT;
use crate::aggregator::{BridgeStatus, QuoteKind, QuoteRequest};
use crate::amount::parse_positive_u256;
use crate::chains::tokens::resolve_token;
use crate::chains::explorer::well_known_chain_name;
use crate::chains::ChainFamily;
use crate::engine::types::{
    BridgeExecuteRequest, BridgeExecuteResponse, BridgeQuoteRequest, BridgeQuoteResponse,
    BridgeStatusRequest, BridgeStatusResponse,
};
use crate::error::EngineResult;
use crate::orchestrator::{validate_bridge, Orchestrator};

impl From<BridgeStatus> for BridgeStatusResponse {
    fn from(status: BridgeStatus) -> Self {
        Self {
            status: status.status,
            sub_status: status.sub_status,
            from_tx_link: status.from_tx_link,
            to_tx_link: status.to_tx_link,
        }
    }
}

impl Orchestrator {
    /// Human name for an aggregator chain id, for response messages.
    fn chain_label(&self, aggregator_chain_id: u64) -> String {
        if let Ok(chain) = self.ctx.registry.by_aggregator_id(aggregator_chain_id) {
            return chain.name.clone();
        }
        well_known_chain_name(aggregator_chain_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("chain {}", aggregator_chain_id))
    }

    fn family_of(&self, aggregator_chain_id: u64) -> ChainFamily {
        self.ctx
            .registry
            .by_aggregator_id(aggregator_chain_id)
            .map(|c| c.family)
            .unwrap_or(ChainFamily::Evm)
    }

    fn bridge_quote_request(&self, request: &BridgeQuoteRequest) -> EngineResult<QuoteRequest> {
        let from_family = self.family_of(request.from_chain_id);
        let to_family = self.family_of(request.to_chain_id);
        validate_bridge(
            from_family,
            request.from_chain_id,
            request.to_chain_id,
            &request.from_token,
            &request.to_token,
        )?;
        let amount = parse_positive_u256(&request.from_amount)?;

        Ok(QuoteRequest {
            kind: QuoteKind::Bridge,
            from_chain: request.from_chain_id,
            to_chain: request.to_chain_id,
            from_token: resolve_token(from_family, &request.from_token),
            to_token: resolve_token(to_family, &request.to_token),
            from_amount: amount.to_string(),
            from_address: request.from_address.clone(),
            to_address: Some(request.to_address.clone()).filter(|a| !a.is_empty()),
            order: request.order.clone(),
            slippage: request.slippage.clone(),
        })
    }

    /// Quote a route without executing it.
    pub async fn bridge_quote(&self, request: &BridgeQuoteRequest) -> EngineResult<BridgeQuoteResponse> {
        let quote_request = self.bridge_quote_request(request)?;
        let solana = self.family_of(request.from_chain_id) == ChainFamily::Sol;
        let quote = self.ctx.aggregator.quote(&quote_request, solana).await?;
        Ok(BridgeQuoteResponse {
            message: format!(
                "Quote via {} from {} to {}: {} in, {} out (min {})",
                quote.tool,
                self.chain_label(request.from_chain_id),
                self.chain_label(request.to_chain_id),
                quote.from_amount,
                quote.to_amount,
                quote.to_amount_min
            ),
            transaction_request: quote.transaction_request,
            estimate: quote.estimate,
        })
    }

    /// Quote and execute from the source chain.
    pub async fn bridge_execute(
        &self,
        request: &BridgeExecuteRequest,
    ) -> EngineResult<BridgeExecuteResponse> {
        let chain = self.ctx.registry.by_aggregator_id(request.from_chain_id)?;
        let quote_request = self.bridge_quote_request(request)?;
        let amount = parse_positive_u256(&request.from_amount)?;
        let signer = self.signer(chain, &request.from_address).await?;

        let quote = self
            .ctx
            .aggregator
            .quote(&quote_request, chain.family == ChainFamily::Sol)
            .await?;
        let tool = quote.tool.clone();
        let execution = self
            .execute_quote(
                chain,
                &signer,
                &request.from_address,
                &quote_request.from_token,
                amount,
                quote,
            )
            .await?;

        Ok(BridgeExecuteResponse {
            explorer_url: chain.explorer_url(&execution.tx_hash),
            tx_hash: execution.tx_hash,
            status: execution.status.to_string(),
            from_chain_id: request.from_chain_id,
            to_chain_id: request.to_chain_id,
            message: format!(
                "Bridge submitted via {} from {} to {}",
                tool,
                self.chain_label(request.from_chain_id),
                self.chain_label(request.to_chain_id)
            ),
        })
    }

    /// One status query.
    pub async fn bridge_status(&self, request: &BridgeStatusRequest) -> EngineResult<BridgeStatusResponse> {
        let status = self
            .ctx
            .aggregator
            .status(&request.tx_hash, request.from_chain_id, request.to_chain_id)
            .await?;
        Ok(status.into())
    }

    /// Poll until `DONE`/`FAILED` or `max_attempts` queries have been made.
    ///
    /// Running out of attempts yields status `TIMEOUT`. A query error is
    /// returned only when it happens on the last attempt.
    pub async fn bridge_status_polling(
        &self,
        request: &BridgeStatusRequest,
        max_attempts: Option<u32>,
    ) -> EngineResult<BridgeStatusResponse> {
        let max_attempts = max_attempts
            .unwrap_or(self.ctx.config.bridge.status_max_attempts)
            .max(1);
        let interval = Duration::from_secs(self.ctx.config.bridge.status_poll_interval_secs);
        tracing::info!(tx_hash = %request.tx_hash, max_attempts, "Polling bridge status");

        for attempt in 1..=max_attempts {
            let queried = self
                .ctx
                .aggregator
                .status(&request.tx_hash, request.from_chain_id, request.to_chain_id)
                .await;
            match queried {
                Ok(status) if status.is_terminal() => {
                    tracing::info!(tx_hash = %request.tx_hash, status = %status.status, attempt, "Bridge reached terminal state");
                    return Ok(status.into());
                }
                Ok(status) => {
                    tracing::debug!(tx_hash = %request.tx_hash, status = %status.status, attempt, "Bridge still in progress");
                }
                Err(e) if attempt == max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(tx_hash = %request.tx_hash, attempt, error = %e, "Bridge status query failed");
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        tracing::warn!(tx_hash = %request.tx_hash, max_attempts, "Bridge status polling timed out");
        Ok(BridgeStatus::timeout().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_response() {
        let resp: BridgeStatusResponse = BridgeStatus::timeout().into();
        assert_eq!(resp.status, STATUS_TIMEOUT);
        assert!(resp.from_tx_link.is_none());
    }
}
