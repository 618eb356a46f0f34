//! EVM transaction building and signing.
//!
//! # Responsibilities
//! - Reserve a nonce on the sender's lane
//! - Pick the gas price (override or network suggestion)
//! - Estimate gas and apply the per-operation policy
//! - Sign once and hand back the raw bytes with their local id

use std::sync::Arc;

use alloy::consensus::TxLegacy;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::rpc::types::TransactionRequest;

use crate::error::{EngineError, EngineResult};
use crate::evm::abi;
use crate::evm::nonce::NonceTracker;
use crate::evm::rpc::EvmRpc;
use crate::evm::wallet::EvmWallet;
use crate::transaction::SignedTransaction;

/// Gas limit rule for one kind of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    /// Stands in for the estimate when estimation fails.
    pub fallback: u64,
    /// Estimates below this are raised to it.
    pub floor: u64,
    /// Multiplier in percent applied to the estimate.
    pub buffer_percent: u64,
}

impl GasPolicy {
    pub const NATIVE_TRANSFER: GasPolicy = GasPolicy {
        fallback: 21_000,
        floor: 21_000,
        buffer_percent: 110,
    };
    pub const ERC20_TRANSFER: GasPolicy = GasPolicy {
        fallback: 100_000,
        floor: 60_000,
        buffer_percent: 120,
    };
    pub const ERC20_APPROVE: GasPolicy = GasPolicy {
        fallback: 100_000,
        floor: 100_000,
        buffer_percent: 120,
    };
    /// Buffered fallback comes to 300k.
    pub const CONTRACT_CALL: GasPolicy = GasPolicy {
        fallback: 250_000,
        floor: 0,
        buffer_percent: 120,
    };

    /// Turn an estimate (or its failure) into a gas limit. The buffer applies either way.
    pub fn apply(&self, estimate: EngineResult<u64>) -> u64 {
        let gas = match estimate {
            Ok(gas) => gas,
            Err(e) => {
                tracing::warn!(error = %e, fallback = self.fallback, "Using fallback gas limit");
                self.fallback
            }
        };
        gas.max(self.floor).saturating_mul(self.buffer_percent) / 100
    }
}

/// Where the gas limit comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasLimit {
    Estimate(GasPolicy),
    /// Supplied by a quote; used verbatim.
    Fixed(u64),
}

/// A signed transaction plus what went into it.
#[derive(Debug, Clone)]
pub struct PreparedTx {
    pub signed: SignedTransaction,
    /// Caller-visible notes, e.g. a contract recipient.
    pub warnings: Vec<String>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// Transaction builder for one sender on one chain.
pub struct EvmTxBuilder {
    chain: String,
    rpc: Arc<dyn EvmRpc>,
    nonces: Arc<NonceTracker>,
    wallet: EvmWallet,
}

impl EvmTxBuilder {
    pub fn new(
        chain: &str,
        rpc: Arc<dyn EvmRpc>,
        nonces: Arc<NonceTracker>,
        wallet: EvmWallet,
    ) -> Self {
        Self {
            chain: chain.to_string(),
            rpc,
            nonces,
            wallet,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Native value transfer. A contract recipient adds a warning but does not block.
    pub async fn build_native_transfer(&self, to: Address, value: U256) -> EngineResult<PreparedTx> {
        let mut warnings = Vec::new();
        let code = self.rpc.code_at(to).await?;
        if !code.is_empty() {
            tracing::warn!(chain = %self.chain, to = %to, "Native transfer recipient is a contract");
            warnings.push(format!(
                "recipient {} is a contract; native transfers to contracts may fail or be lost",
                to
            ));
        }
        self.finalize(
            to,
            value,
            Bytes::new(),
            GasLimit::Estimate(GasPolicy::NATIVE_TRANSFER),
            None,
            warnings,
        )
        .await
    }

    pub async fn build_erc20_transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> EngineResult<PreparedTx> {
        self.finalize(
            token,
            U256::ZERO,
            abi::encode_transfer(to, amount),
            GasLimit::Estimate(GasPolicy::ERC20_TRANSFER),
            None,
            Vec::new(),
        )
        .await
    }

    pub async fn build_erc20_approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> EngineResult<PreparedTx> {
        self.finalize(
            token,
            U256::ZERO,
            abi::encode_approve(spender, amount),
            GasLimit::Estimate(GasPolicy::ERC20_APPROVE),
            None,
            Vec::new(),
        )
        .await
    }

    /// Arbitrary call, used for quote payloads and router swaps.
    pub async fn build_contract_call(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_limit: Option<u64>,
        gas_price: Option<u128>,
    ) -> EngineResult<PreparedTx> {
        let gas = match gas_limit {
            Some(limit) => GasLimit::Fixed(limit),
            None => GasLimit::Estimate(GasPolicy::CONTRACT_CALL),
        };
        self.finalize(to, value, data, gas, gas_price, Vec::new()).await
    }

    async fn finalize(
        &self,
        to: Address,
        value: U256,
        input: Bytes,
        gas: GasLimit,
        gas_price_override: Option<u128>,
        warnings: Vec<String>,
    ) -> EngineResult<PreparedTx> {
        let from = self.wallet.address();

        // Lane stays locked until the transaction is signed.
        let lease = self.nonces.acquire(&self.chain, from, self.rpc.as_ref()).await?;
        let nonce = lease.nonce();

        let gas_price = match gas_price_override {
            Some(price) => price,
            None => self.rpc.gas_price().await?,
        };

        let gas_limit = match gas {
            GasLimit::Fixed(limit) => limit,
            GasLimit::Estimate(policy) => {
                let request = TransactionRequest::default()
                    .with_from(from)
                    .with_to(to)
                    .with_value(value)
                    .with_input(input.clone())
                    .with_nonce(nonce);
                let estimate = self
                    .rpc
                    .estimate_gas(&request)
                    .await
                    .map_err(|e| EngineError::GasEstimationFailed(e.to_string()));
                policy.apply(estimate)
            }
        };

        let tx = TxLegacy {
            chain_id: Some(self.wallet.chain_id()),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value,
            input,
        };
        let signed = self.wallet.sign_legacy(&self.chain, tx)?;
        lease.commit();

        tracing::info!(
            chain = %self.chain,
            from = %from,
            to = %to,
            nonce,
            gas_limit,
            gas_price,
            tx_hash = %signed.local_tx_id,
            "EVM transaction signed"
        );

        Ok(PreparedTx {
            signed,
            warnings,
            nonce,
            gas_limit,
            gas_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyMaterial;
    use alloy::consensus::{Transaction, TxEnvelope};
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::{address, TxHash};
    use async_trait::async_trait;

    struct StubRpc {
        estimate: Option<u64>,
        code: Bytes,
    }

    #[async_trait]
    impl EvmRpc for StubRpc {
        async fn chain_id(&self) -> EngineResult<u64> {
            Ok(97)
        }
        async fn pending_nonce(&self, _address: Address) -> EngineResult<u64> {
            Ok(12)
        }
        async fn gas_price(&self) -> EngineResult<u128> {
            Ok(5_000_000_000)
        }
        async fn estimate_gas(&self, _tx: &TransactionRequest) -> EngineResult<u64> {
            self.estimate
                .ok_or_else(|| EngineError::RpcUnavailable("execution reverted".into()))
        }
        async fn code_at(&self, _address: Address) -> EngineResult<Bytes> {
            Ok(self.code.clone())
        }
        async fn call(&self, _tx: &TransactionRequest) -> EngineResult<Bytes> {
            Ok(Bytes::new())
        }
        async fn send_raw_transaction(&self, _raw: &[u8]) -> EngineResult<TxHash> {
            Ok(TxHash::ZERO)
        }
        async fn receipt_status(&self, _tx_hash: TxHash) -> EngineResult<Option<bool>> {
            Ok(Some(true))
        }
    }

    fn builder(estimate: Option<u64>, code: Bytes) -> EvmTxBuilder {
        let key = KeyMaterial::parse(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let wallet = EvmWallet::from_key(&key, 97).unwrap();
        EvmTxBuilder::new(
            "BSC-TestNet",
            Arc::new(StubRpc { estimate, code }),
            Arc::new(NonceTracker::new()),
            wallet,
        )
    }

    fn decode(prepared: &PreparedTx) -> TxEnvelope {
        TxEnvelope::decode_2718(&mut prepared.signed.raw.as_slice()).unwrap()
    }

    #[test]
    fn test_gas_policy_table() {
        assert_eq!(GasPolicy::NATIVE_TRANSFER.apply(Ok(21_000)), 23_100);
        assert_eq!(GasPolicy::NATIVE_TRANSFER.apply(Ok(1)), 23_100);
        assert_eq!(GasPolicy::ERC20_TRANSFER.apply(Ok(50_000)), 72_000);
        assert_eq!(GasPolicy::ERC20_APPROVE.apply(Ok(46_000)), 120_000);
        assert_eq!(GasPolicy::CONTRACT_CALL.apply(Ok(200_000)), 240_000);

        let failed = || Err(EngineError::GasEstimationFailed("reverted".into()));
        assert_eq!(GasPolicy::NATIVE_TRANSFER.apply(failed()), 23_100);
        assert_eq!(GasPolicy::ERC20_TRANSFER.apply(failed()), 120_000);
        assert_eq!(GasPolicy::ERC20_APPROVE.apply(failed()), 120_000);
        assert_eq!(GasPolicy::CONTRACT_CALL.apply(failed()), 300_000);
    }

    #[tokio::test]
    async fn test_native_transfer_value_round_trips() {
        let builder = builder(Some(21_000), Bytes::new());
        let value = crate::amount::parse_u256("1000000000000000").unwrap();
        let to = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

        let prepared = builder.build_native_transfer(to, value).await.unwrap();
        assert!(prepared.warnings.is_empty());
        assert_eq!(prepared.nonce, 12);
        assert_eq!(prepared.gas_limit, 23_100);

        let tx = decode(&prepared);
        assert_eq!(tx.value(), value);
        assert_eq!(tx.to(), Some(to));
        assert_eq!(tx.gas_price(), Some(5_000_000_000));
    }

    #[tokio::test]
    async fn test_contract_recipient_warns() {
        let builder = builder(Some(21_000), Bytes::from(vec![0x60, 0x80]));
        let prepared = builder
            .build_native_transfer(Address::repeat_byte(1), U256::from(1u64))
            .await
            .unwrap();
        assert_eq!(prepared.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_erc20_transfer_falls_back_on_estimate_failure() {
        let builder = builder(None, Bytes::new());
        let token = Address::repeat_byte(0x55);
        let prepared = builder
            .build_erc20_transfer(token, Address::repeat_byte(2), U256::from(5u64))
            .await
            .unwrap();
        assert_eq!(prepared.gas_limit, 120_000);

        let tx = decode(&prepared);
        assert_eq!(tx.to(), Some(token));
        assert_eq!(tx.value(), U256::ZERO);
        assert_eq!(&tx.input()[..4], &abi::TRANSFER_SELECTOR);
    }

    #[tokio::test]
    async fn test_quote_gas_used_verbatim() {
        let builder = builder(Some(1), Bytes::new());
        let prepared = builder
            .build_contract_call(
                Address::repeat_byte(3),
                Bytes::from(vec![1, 2, 3, 4]),
                U256::ZERO,
                Some(412_345),
                Some(7),
            )
            .await
            .unwrap();
        assert_eq!(prepared.gas_limit, 412_345);
        assert_eq!(prepared.gas_price, 7);
    }

    #[tokio::test]
    async fn test_consecutive_builds_use_consecutive_nonces() {
        let builder = builder(Some(21_000), Bytes::new());
        let first = builder
            .build_native_transfer(Address::repeat_byte(4), U256::from(1u64))
            .await
            .unwrap();
        let second = builder
            .build_native_transfer(Address::repeat_byte(4), U256::from(1u64))
            .await
            .unwrap();
        assert_eq!(first.nonce, 12);
        assert_eq!(second.nonce, 13);
        assert_ne!(first.signed.local_tx_id, second.signed.local_tx_id);
    }
}
