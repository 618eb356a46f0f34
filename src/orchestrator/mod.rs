//! Swap and bridge orchestration.
//!
//! # Data Flow
//! ```text
//! request → validate (no network) → signer → quote
//!     → allowance pre-flight (non-native source with an approval address)
//!     → build payload, sign once → dispatcher.submit_now → response
//! ```
//!
//! EVM testnets with a configured router skip the aggregator and call the
//! router directly.

pub mod bridge;
pub mod swap;

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Bytes, U256};

use crate::aggregator::Quote;
use crate::chains::tokens::same_token;
use crate::chains::{is_native_token, ChainConfig, ChainFamily};
use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::evm::{self, EvmRpc, EvmSubmitter, EvmTxBuilder};
use crate::solana::{SolanaKeypair, SolanaRpc, SolanaSubmitter, SolanaTxBuilder};
use crate::transaction::{STATUS_PENDING, STATUS_UNCONFIRMED};

/// Reject swaps that would not change the asset.
pub fn validate_swap(family: ChainFamily, from_token: &str, to_token: &str) -> EngineResult<()> {
    if is_native_token(family, from_token) && is_native_token(family, to_token) {
        return Err(EngineError::InvalidOperation(
            "cannot swap the native token for itself".to_string(),
        ));
    }
    if same_token(family, from_token, to_token) {
        return Err(EngineError::InvalidOperation(
            "from_token and to_token are the same".to_string(),
        ));
    }
    Ok(())
}

/// A bridge is rejected only when both chain and token are unchanged.
pub fn validate_bridge(
    family: ChainFamily,
    from_chain: u64,
    to_chain: u64,
    from_token: &str,
    to_token: &str,
) -> EngineResult<()> {
    if from_chain == to_chain && same_token(family, from_token, to_token) {
        return Err(EngineError::InvalidOperation(
            "bridge source and destination are identical".to_string(),
        ));
    }
    Ok(())
}

/// Transaction id and status of an executed route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub tx_hash: String,
    pub status: &'static str,
}

/// Signing context for the chain a route starts on.
pub(crate) enum RouteSigner {
    Evm {
        builder: EvmTxBuilder,
        rpc: Arc<dyn EvmRpc>,
    },
    Sol {
        builder: SolanaTxBuilder,
        keypair: SolanaKeypair,
        rpc: Arc<dyn SolanaRpc>,
    },
}

/// Runs swaps and bridges against the shared context.
pub struct Orchestrator {
    ctx: Arc<EngineContext>,
}

impl Orchestrator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    pub(crate) async fn signer(
        &self,
        chain: &ChainConfig,
        from_address: &str,
    ) -> EngineResult<RouteSigner> {
        match chain.family {
            ChainFamily::Evm => {
                let (builder, rpc) = self.ctx.evm_builder(chain, from_address).await?;
                Ok(RouteSigner::Evm { builder, rpc })
            }
            ChainFamily::Sol => {
                let (builder, keypair, rpc) = self.ctx.solana_signer(chain, from_address).await?;
                Ok(RouteSigner::Sol {
                    builder,
                    keypair,
                    rpc,
                })
            }
            ChainFamily::Btc => Err(EngineError::InvalidOperation(
                "BTC routes are not supported".to_string(),
            )),
        }
    }

    /// Pre-flight, sign once and submit. The quote is consumed.
    pub(crate) async fn execute_quote(
        &self,
        chain: &ChainConfig,
        signer: &RouteSigner,
        from_address: &str,
        from_token: &str,
        amount: U256,
        quote: Quote,
    ) -> EngineResult<Execution> {
        match signer {
            RouteSigner::Evm { builder, rpc } => {
                self.execute_evm_quote(chain, builder, rpc.clone(), from_address, from_token, amount, quote)
                    .await
            }
            RouteSigner::Sol {
                builder,
                keypair,
                rpc,
            } => {
                self.execute_solana_quote(builder, keypair, rpc.clone(), from_address, quote)
                    .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_evm_quote(
        &self,
        chain: &ChainConfig,
        builder: &EvmTxBuilder,
        rpc: Arc<dyn EvmRpc>,
        from_address: &str,
        from_token: &str,
        amount: U256,
        quote: Quote,
    ) -> EngineResult<Execution> {
        if !is_native_token(ChainFamily::Evm, from_token) {
            if let Some(spender) = quote.approval_address.as_deref() {
                let token = evm::parse_address(from_token)?;
                let spender = evm::parse_address(spender)?;
                let preflight = self
                    .ctx
                    .allowance_manager(chain, rpc.clone())
                    .ensure_allowance(builder, &self.ctx.dispatcher, token, spender, amount)
                    .await?;
                tracing::debug!(quote_id = %quote.id, ?preflight, "Allowance pre-flight done");
            }
        }

        let to = quote
            .to_contract
            .as_deref()
            .ok_or_else(|| EngineError::InvalidQuote("quote has no target contract".to_string()))
            .and_then(evm::parse_address)?;
        let data = Bytes::from_str(&quote.call_data)
            .map_err(|e| EngineError::InvalidQuote(format!("call data is not hex: {}", e)))?;

        let prepared = builder
            .build_contract_call(to, data, quote.value, quote.gas_limit, quote.gas_price)
            .await?;
        let submitter = EvmSubmitter::new(rpc);
        let reported = self
            .ctx
            .dispatcher
            .submit_now(&prepared.signed, from_address, &submitter)
            .await?;
        if !reported.eq_ignore_ascii_case(&prepared.signed.local_tx_id) {
            tracing::warn!(
                local = %prepared.signed.local_tx_id,
                reported = %reported,
                "Node reported a different transaction hash"
            );
        }

        tracing::info!(chain = %chain.name, quote_id = %quote.id, tool = %quote.tool, tx_hash = %prepared.signed.local_tx_id, "Route submitted");
        Ok(Execution {
            tx_hash: prepared.signed.local_tx_id,
            status: STATUS_PENDING,
        })
    }

    async fn execute_solana_quote(
        &self,
        builder: &SolanaTxBuilder,
        keypair: &SolanaKeypair,
        rpc: Arc<dyn SolanaRpc>,
        from_address: &str,
        quote: Quote,
    ) -> EngineResult<Execution> {
        let signed = builder.sign_serialized_transaction(keypair, &quote.call_data)?;
        let submitter = SolanaSubmitter::new(rpc);
        match self
            .ctx
            .dispatcher
            .submit_now(&signed, from_address, &submitter)
            .await
        {
            Ok(_) => Ok(Execution {
                tx_hash: signed.local_tx_id,
                status: STATUS_PENDING,
            }),
            Err(e @ EngineError::BroadcastFailed { .. }) if builder.degraded_mode() => {
                tracing::warn!(tx_hash = %signed.local_tx_id, error = %e, "Returning unconfirmed signature (degraded mode)");
                Ok(Execution {
                    tx_hash: signed.local_tx_id,
                    status: STATUS_UNCONFIRMED,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::tokens::{EVM_NATIVE, ZERO_ADDRESS};

    const USDT: &str = "0x55d398326f99059fF775485246999027B3197955";

    #[test]
    fn test_same_token_swaps_rejected() {
        assert!(matches!(
            validate_swap(ChainFamily::Evm, USDT, &USDT.to_lowercase()),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(matches!(
            validate_swap(ChainFamily::Evm, ZERO_ADDRESS, EVM_NATIVE),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(matches!(
            validate_swap(ChainFamily::Sol, "SOL", ""),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(validate_swap(ChainFamily::Evm, "", USDT).is_ok());
    }

    #[test]
    fn test_bridge_validation_allows_same_token_across_chains() {
        assert!(validate_bridge(ChainFamily::Evm, 56, 42161, "", "").is_ok());
        assert!(validate_bridge(ChainFamily::Evm, 56, 56, "", USDT).is_ok());
        assert!(matches!(
            validate_bridge(ChainFamily::Evm, 56, 56, USDT, USDT),
            Err(EngineError::InvalidOperation(_))
        ));
    }

}
