//! ERC20 allowance manager.
//!
//! # Responsibilities
//! - Read allowances live (never cached)
//! - Approve and wait for the receipt within a bounded window
//! - Pre-flight a spender before a swap or bridge
//! - Scan well-known spenders for standing approvals
//!
//! # Data Flow
//! ```text
//! check_allowance → eth_call allowance(owner, spender), retried with linear backoff
//! ensure_allowance → current < required ? approve_and_wait(U256::MAX) : Sufficient
//! approve_and_wait → builder (approve) → dispatcher.submit_now → receipt poll
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use futures_util::future::join_all;
use serde::Serialize;

use crate::broadcast::BroadcastDispatcher;
use crate::config::schema::AllowanceConfig;
use crate::error::{EngineError, EngineResult};
use crate::evm::abi;
use crate::evm::builder::EvmTxBuilder;
use crate::evm::rpc::{EvmRpc, EvmSubmitter};
use crate::resilience::{retry_async_when, RetryPolicy};

/// Spenders checked by `list_approvals`.
pub const WELL_KNOWN_SPENDERS: &[(&str, &str)] = &[
    ("0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE", "LI.FI Diamond"),
    ("0x1111111254fb6c44bac0bed2854e76f90643097d", "1inch Router"),
    ("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45", "Uniswap Router"),
];

/// An allowance above 90% of `U256::MAX` counts as unlimited.
pub fn is_unlimited(amount: U256) -> bool {
    amount > U256::MAX / U256::from(10u8) * U256::from(9u8)
}

/// Result of waiting for an approve receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Confirmed,
    /// No receipt within the window. Inconclusive, not a failure.
    TimedOut,
}

/// What the allowance pre-flight did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowancePreflight {
    Sufficient { current: U256 },
    Approved { tx_hash: String, outcome: ApprovalOutcome },
}

/// A non-zero standing approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalEntry {
    pub token_address: String,
    pub spender_address: String,
    pub spender_name: String,
    pub allowance: String,
    pub is_unlimited: bool,
}

/// Allowance reads and approvals on one EVM chain.
pub struct AllowanceManager {
    chain: String,
    rpc: Arc<dyn EvmRpc>,
    config: AllowanceConfig,
}

impl AllowanceManager {
    pub fn new(chain: &str, rpc: Arc<dyn EvmRpc>, config: AllowanceConfig) -> Self {
        Self {
            chain: chain.to_string(),
            rpc,
            config,
        }
    }

    /// Live `allowance(owner, spender)`. Empty or short output reads as zero.
    pub async fn check_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> EngineResult<U256> {
        let request = TransactionRequest::default()
            .with_to(token)
            .with_input(abi::encode_allowance(owner, spender));
        let policy = RetryPolicy::linear(self.config.check_attempts, self.config.retry_base_delay_ms);
        let rpc = self.rpc.as_ref();

        let output = retry_async_when(&policy, "check_allowance", EngineError::is_transient, |_| {
            let request = &request;
            async move { rpc.call(request).await }
        })
        .await
        .map_err(|e| {
            EngineError::RpcUnavailable(format!(
                "allowance check failed after {} attempts: {}",
                e.attempts, e.last
            ))
        })?;

        let allowance = abi::decode_uint256(&output);
        tracing::debug!(chain = %self.chain, token = %token, owner = %owner, spender = %spender, allowance = %allowance, "Allowance read");
        Ok(allowance)
    }

    /// Sign and submit an approve; returns the transaction hash once accepted.
    pub async fn approve(
        &self,
        builder: &EvmTxBuilder,
        dispatcher: &BroadcastDispatcher,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> EngineResult<String> {
        let prepared = builder.build_erc20_approve(token, spender, amount).await?;
        let submitter = EvmSubmitter::new(self.rpc.clone());
        dispatcher
            .submit_now(&prepared.signed, &format!("{:#x}", builder.address()), &submitter)
            .await?;
        tracing::info!(
            chain = %self.chain,
            token = %token,
            spender = %spender,
            unlimited = is_unlimited(amount),
            tx_hash = %prepared.signed.local_tx_id,
            "Approve submitted"
        );
        Ok(prepared.signed.local_tx_id)
    }

    /// Poll for the receipt until it lands or the window closes.
    pub async fn wait_for_receipt(&self, tx_hash: &str) -> EngineResult<ApprovalOutcome> {
        let hash: TxHash = tx_hash
            .parse()
            .map_err(|e| EngineError::InvalidOperation(format!("bad tx hash {}: {}", tx_hash, e)))?;
        let poll = Duration::from_secs(self.config.receipt_poll_secs);
        let window = Duration::from_secs(self.config.receipt_timeout_secs);

        let waited = tokio::time::timeout(window, async {
            let mut ticker = tokio::time::interval(poll);
            loop {
                ticker.tick().await;
                match self.rpc.receipt_status(hash).await {
                    Ok(Some(true)) => return Ok(ApprovalOutcome::Confirmed),
                    Ok(Some(false)) => {
                        return Err(EngineError::ApproveFailed(format!(
                            "approve {} reverted",
                            tx_hash
                        )))
                    }
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Approve pending"),
                    Err(e) => tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
                }
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(chain = %self.chain, tx_hash = %tx_hash, timeout_secs = window.as_secs(), "No approve receipt within window");
                Ok(ApprovalOutcome::TimedOut)
            }
        }
    }

    pub async fn approve_and_wait(
        &self,
        builder: &EvmTxBuilder,
        dispatcher: &BroadcastDispatcher,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> EngineResult<(String, ApprovalOutcome)> {
        let tx_hash = self.approve(builder, dispatcher, token, spender, amount).await?;
        let outcome = self.wait_for_receipt(&tx_hash).await?;
        Ok((tx_hash, outcome))
    }

    /// Approve `U256::MAX` iff the current allowance is below `required`.
    ///
    /// A timed-out receipt is settled by re-reading the allowance once.
    pub async fn ensure_allowance(
        &self,
        builder: &EvmTxBuilder,
        dispatcher: &BroadcastDispatcher,
        token: Address,
        spender: Address,
        required: U256,
    ) -> EngineResult<AllowancePreflight> {
        let owner = builder.address();
        let current = self.check_allowance(token, owner, spender).await?;
        if current >= required {
            return Ok(AllowancePreflight::Sufficient { current });
        }

        tracing::info!(chain = %self.chain, token = %token, spender = %spender, current = %current, required = %required, "Allowance too low, approving");
        let (tx_hash, outcome) = self
            .approve_and_wait(builder, dispatcher, token, spender, U256::MAX)
            .await?;

        if outcome == ApprovalOutcome::TimedOut {
            let after = self.check_allowance(token, owner, spender).await?;
            if after < required {
                return Err(EngineError::ApproveFailed(format!(
                    "approve {} not effective after {}s",
                    tx_hash, self.config.receipt_timeout_secs
                )));
            }
        }
        Ok(AllowancePreflight::Approved { tx_hash, outcome })
    }

    /// Non-zero allowances of `owner` toward the well-known spenders.
    ///
    /// A failed lookup is logged and skipped.
    pub async fn list_approvals(
        &self,
        owner: Address,
        tokens: &[Address],
    ) -> EngineResult<Vec<ApprovalEntry>> {
        let spenders = WELL_KNOWN_SPENDERS
            .iter()
            .map(|(address, name)| {
                address
                    .parse::<Address>()
                    .map(|a| (a, *name))
                    .map_err(|e| EngineError::InvalidAddress(e.to_string()))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let lookups = tokens.iter().flat_map(|token| {
            spenders.iter().map(move |(spender, name)| async move {
                let result = self.check_allowance(*token, owner, *spender).await;
                (*token, *spender, *name, result)
            })
        });

        let mut entries = Vec::new();
        for (token, spender, name, result) in join_all(lookups).await {
            match result {
                Ok(allowance) if !allowance.is_zero() => entries.push(ApprovalEntry {
                    token_address: token.to_checksum(None),
                    spender_address: spender.to_checksum(None),
                    spender_name: name.to_string(),
                    allowance: allowance.to_string(),
                    is_unlimited: is_unlimited(allowance),
                }),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(chain = %self.chain, token = %token, spender = %spender, error = %e, "Skipping allowance lookup")
                }
            }
        }
        Ok(entries)
    }
}
