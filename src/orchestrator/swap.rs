//! Same-chain swaps.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};

use crate::aggregator::{QuoteKind, QuoteRequest};
use crate::amount::parse_positive_u256;
use crate::chains::tokens::resolve_token;
use crate::chains::{is_native_token, ChainConfig, ChainFamily};
use crate::engine::types::{SwapRequest, TransactionResponse};
use crate::error::{EngineError, EngineResult};
use crate::evm::abi::{self, RouterSwap};
use crate::evm::{self, EvmSubmitter};
use crate::orchestrator::{validate_swap, Execution, Orchestrator};
use crate::transaction::STATUS_PENDING;

/// Router swaps expire this many seconds after signing.
const ROUTER_DEADLINE_SECS: u64 = 600;

/// Router path for a swap, routed via the wrapped native token when neither side is native.
fn router_path(
    from_native: bool,
    to_native: bool,
    from: Option<Address>,
    to: Option<Address>,
    wrapped: Address,
) -> EngineResult<(RouterSwap, Vec<Address>)> {
    match (from_native, to_native, from, to) {
        (true, false, _, Some(to)) => Ok((RouterSwap::NativeForTokens, vec![wrapped, to])),
        (false, true, Some(from), _) => Ok((RouterSwap::TokensForNative, vec![from, wrapped])),
        (false, false, Some(from), Some(to)) => {
            let mut path = vec![from];
            if from != wrapped && to != wrapped {
                path.push(wrapped);
            }
            path.push(to);
            Ok((RouterSwap::TokensForTokens, path))
        }
        _ => Err(EngineError::InvalidOperation(
            "unsupported router swap direction".to_string(),
        )),
    }
}

impl Orchestrator {
    /// Swap `amount` of `from_token` into `to_token` on one chain.
    pub async fn swap(&self, request: &SwapRequest) -> EngineResult<TransactionResponse> {
        let chain = self.ctx.registry.resolve(&request.chain)?;
        validate_swap(chain.family, &request.from_token, &request.to_token)?;
        let amount = parse_positive_u256(&request.amount)?;

        let (tx_hash, status, message) = match chain.family {
            ChainFamily::Btc => {
                return Err(EngineError::InvalidOperation(
                    "BTC does not support swaps".to_string(),
                ))
            }
            ChainFamily::Sol if chain.testnet => {
                return Err(EngineError::NotImplemented(
                    "native Solana DEX swaps".to_string(),
                ))
            }
            ChainFamily::Evm if chain.testnet => {
                if chain.dex_router.is_none() {
                    return Err(EngineError::NotImplemented(format!(
                        "swaps on {} (no DEX router configured)",
                        chain.name
                    )));
                }
                let tx_hash = self.router_swap(chain, request, amount).await?;
                (tx_hash, STATUS_PENDING, "Router swap submitted".to_string())
            }
            ChainFamily::Evm | ChainFamily::Sol => {
                let execution = self.aggregator_swap(chain, request, amount).await?;
                (execution.tx_hash, execution.status, "Swap submitted".to_string())
            }
        };

        Ok(TransactionResponse {
            explorer_url: chain.explorer_url(&tx_hash),
            tx_hash,
            status: status.to_string(),
            chain: chain.name.clone(),
            message,
            warnings: Vec::new(),
        })
    }

    async fn aggregator_swap(
        &self,
        chain: &ChainConfig,
        request: &SwapRequest,
        amount: U256,
    ) -> EngineResult<Execution> {
        let chain_id = chain.aggregator_chain_id().ok_or_else(|| {
            EngineError::UnsupportedChain(format!("{} has no aggregator chain id", chain.name))
        })?;
        let signer = self.signer(chain, &request.from_address).await?;

        let from_token = resolve_token(chain.family, &request.from_token);
        let quote_request = QuoteRequest {
            kind: QuoteKind::Swap,
            from_chain: chain_id,
            to_chain: chain_id,
            from_token: from_token.clone(),
            to_token: resolve_token(chain.family, &request.to_token),
            from_amount: amount.to_string(),
            from_address: request.from_address.clone(),
            to_address: request.to_address.clone(),
            order: None,
            slippage: None,
        };
        let quote = self
            .ctx
            .aggregator
            .quote(&quote_request, chain.family == ChainFamily::Sol)
            .await?;

        self.execute_quote(chain, &signer, &request.from_address, &from_token, amount, quote)
            .await
    }

    async fn router_swap(
        &self,
        chain: &ChainConfig,
        request: &SwapRequest,
        amount: U256,
    ) -> EngineResult<String> {
        let router = chain
            .dex_router
            .as_deref()
            .ok_or_else(|| EngineError::NotImplemented(format!("swaps on {}", chain.name)))
            .and_then(evm::parse_address)?;
        let wrapped = chain
            .wrapped_native
            .as_deref()
            .ok_or_else(|| {
                EngineError::NotImplemented(format!("{} has no wrapped native token", chain.name))
            })
            .and_then(evm::parse_address)?;

        let from_native = is_native_token(ChainFamily::Evm, &request.from_token);
        let to_native = is_native_token(ChainFamily::Evm, &request.to_token);
        let from_token = (!from_native)
            .then(|| evm::parse_address(&request.from_token))
            .transpose()?;
        let to_token = (!to_native)
            .then(|| evm::parse_address(&request.to_token))
            .transpose()?;
        let (kind, path) = router_path(from_native, to_native, from_token, to_token, wrapped)?;

        let (builder, rpc) = self.ctx.evm_builder(chain, &request.from_address).await?;
        let recipient = match request.to_address.as_deref().filter(|a| !a.is_empty()) {
            Some(to) => evm::parse_address(to)?,
            None => builder.address(),
        };

        if let Some(token) = from_token {
            self.ctx
                .allowance_manager(chain, rpc.clone())
                .ensure_allowance(&builder, &self.ctx.dispatcher, token, router, amount)
                .await?;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let deadline = U256::from(now + ROUTER_DEADLINE_SECS);
        let data = abi::encode_router_swap(kind, amount, U256::ZERO, path, recipient, deadline);
        let value = if from_native { amount } else { U256::ZERO };

        let prepared = builder
            .build_contract_call(router, data, value, None, None)
            .await?;
        let submitter = EvmSubmitter::new(rpc);
        self.ctx
            .dispatcher
            .submit_now(&prepared.signed, &request.from_address, &submitter)
            .await?;

        tracing::info!(chain = %chain.name, router = %router, kind = ?kind, tx_hash = %prepared.signed.local_tx_id, "Router swap submitted");
        Ok(prepared.signed.local_tx_id)
    }
}
