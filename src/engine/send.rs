//! Plain value and token transfers.

use std::sync::Arc;

use crate::amount::{parse_positive_u256, parse_u64};
use crate::btc::{self, BtcSubmitter, BtcTxBuilder};
use crate::chains::{is_native_token, ChainConfig, ChainFamily};
use crate::engine::types::{SendRequest, TransactionResponse};
use crate::engine::{observed, TransactionEngine};
use crate::error::{EngineError, EngineResult};
use crate::evm::{self, EvmSubmitter};
use crate::solana::SolanaSubmitter;
use crate::transaction::{STATUS_PENDING, STATUS_UNCONFIRMED};

impl TransactionEngine {
    /// Transfer `amount` of `from_token` to `to_address`.
    ///
    /// EVM and Solana transfers are broadcast in the background; the
    /// response carries the locally computed id. BTC waits for the indexer
    /// and returns the txid it reports.
    pub async fn send(&self, request: &SendRequest) -> EngineResult<TransactionResponse> {
        observed("send", &request.chain, async {
            let chain = self.ctx.registry.resolve(&request.chain)?;
            match chain.family {
                ChainFamily::Evm => self.send_evm(chain, request).await,
                ChainFamily::Btc => self.send_btc(chain, request).await,
                ChainFamily::Sol => self.send_sol(chain, request).await,
            }
        })
        .await
    }

    async fn send_evm(
        &self,
        chain: &ChainConfig,
        request: &SendRequest,
    ) -> EngineResult<TransactionResponse> {
        let to = evm::parse_address(&request.to_address)?;
        let amount = parse_positive_u256(&request.amount)?;
        let token = if is_native_token(ChainFamily::Evm, &request.from_token) {
            None
        } else {
            Some(evm::parse_address(&request.from_token)?)
        };

        let (builder, rpc) = self.ctx.evm_builder(chain, &request.from_address).await?;
        let prepared = match token {
            None => builder.build_native_transfer(to, amount).await?,
            Some(token) => builder.build_erc20_transfer(token, to, amount).await?,
        };

        let tx_hash = self.ctx.dispatcher.dispatch_detached(
            prepared.signed,
            request.from_address.clone(),
            Arc::new(EvmSubmitter::new(rpc)),
        );

        Ok(TransactionResponse {
            explorer_url: chain.explorer_url(&tx_hash),
            tx_hash,
            status: STATUS_PENDING.to_string(),
            chain: chain.name.clone(),
            message: "Transaction submitted".to_string(),
            warnings: prepared.warnings,
        })
    }

    async fn send_btc(
        &self,
        chain: &ChainConfig,
        request: &SendRequest,
    ) -> EngineResult<TransactionResponse> {
        if !is_native_token(ChainFamily::Btc, &request.from_token) {
            return Err(EngineError::InvalidOperation(
                "only native BTC can be sent".to_string(),
            ));
        }
        for address in [&request.from_address, &request.to_address] {
            if !btc::is_valid_address(address) {
                return Err(EngineError::InvalidAddress(format!(
                    "'{}' is not a Bitcoin address",
                    address
                )));
            }
        }
        let amount = parse_u64(&request.amount)?;

        let indexer = self.ctx.backends.utxo(chain)?;
        let key = self.ctx.keys.signing_key(&request.from_address).await?;
        let utxos = indexer.utxos(&request.from_address).await?;
        let builder = BtcTxBuilder::new(self.ctx.config.btc.fee_sats);
        let signed = builder.build_signed(
            &chain.name,
            &key,
            &request.from_address,
            &request.to_address,
            amount,
            &utxos,
        )?;

        let submitter = BtcSubmitter::new(indexer);
        let txid = self
            .ctx
            .dispatcher
            .submit_now(&signed, &request.from_address, &submitter)
            .await?;
        if txid != signed.local_tx_id {
            tracing::warn!(local = %signed.local_tx_id, reported = %txid, "Indexer reported a different txid");
        }

        Ok(TransactionResponse {
            explorer_url: chain.explorer_url(&txid),
            tx_hash: txid,
            status: STATUS_PENDING.to_string(),
            chain: chain.name.clone(),
            message: "Transaction broadcast".to_string(),
            warnings: Vec::new(),
        })
    }

    async fn send_sol(
        &self,
        chain: &ChainConfig,
        request: &SendRequest,
    ) -> EngineResult<TransactionResponse> {
        if !is_native_token(ChainFamily::Sol, &request.from_token) {
            return Err(EngineError::NotImplemented("SPL token transfers".to_string()));
        }
        let lamports = parse_u64(&request.amount)?;

        let (builder, keypair, rpc) = self
            .ctx
            .solana_signer(chain, &request.from_address)
            .await?;
        let signed = builder
            .build_transfer(&keypair, &request.to_address, lamports)
            .await?;

        let mut status = STATUS_PENDING;
        let mut warnings = Vec::new();
        if signed.placeholder_blockhash {
            status = STATUS_UNCONFIRMED;
            warnings.push(
                "signed against a placeholder blockhash; the cluster is expected to reject it"
                    .to_string(),
            );
        }

        let tx_hash = self.ctx.dispatcher.dispatch_detached(
            signed.signed,
            request.from_address.clone(),
            Arc::new(SolanaSubmitter::new(rpc)),
        );

        Ok(TransactionResponse {
            explorer_url: chain.explorer_url(&tx_hash),
            tx_hash,
            status: status.to_string(),
            chain: chain.name.clone(),
            message: "Transaction submitted".to_string(),
            warnings,
        })
    }
}
