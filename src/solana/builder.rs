//! Solana transfer, swap-skeleton, and aggregator payload handling.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::chains::ChainFamily;
use crate::error::{EngineError, EngineResult};
use crate::keys::KeyMaterial;
use crate::solana::keypair::SolanaKeypair;
use crate::solana::message::{self, AccountMeta, Instruction, Message};
use crate::solana::rpc::SolanaRpc;
use crate::solana::{Pubkey, SYSTEM_PROGRAM_ID, SYSVAR_CLOCK_ID, TOKEN_PROGRAM_ID};
use crate::transaction::SignedTransaction;

/// System program instruction index for `Transfer`.
const SYSTEM_TRANSFER: u32 = 2;

/// Accounts for the swap instruction skeleton.
#[derive(Debug, Clone, Copy)]
pub struct SwapAccounts {
    pub user: Pubkey,
    pub user_source: Pubkey,
    pub pool_source: Pubkey,
    pub pool_destination: Pubkey,
    pub user_destination: Pubkey,
}

/// A signed Solana transaction and whether it used the placeholder blockhash.
#[derive(Debug, Clone)]
pub struct SolanaSigned {
    pub signed: SignedTransaction,
    pub placeholder_blockhash: bool,
}

/// Parse the key and check it controls `from_address`.
pub fn materialize_account(key: &KeyMaterial, from_address: &str) -> EngineResult<SolanaKeypair> {
    let expected: Pubkey = from_address.parse()?;
    let keypair = SolanaKeypair::from_key(key)?;
    keypair.ensure_address(&expected)?;
    Ok(keypair)
}

/// `SystemProgram::Transfer { lamports }` from `from` to `to`.
pub fn build_transfer_instruction(from: Pubkey, to: Pubkey, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![AccountMeta::new(from, true), AccountMeta::new(to, false)],
        data,
    }
}

/// Token-swap instruction skeleton: `[1, amount_in LE, min_out LE]`.
///
/// Structurally valid but never submitted; pool discovery is not done here.
pub fn build_swap_instruction(
    program_id: Pubkey,
    accounts: &SwapAccounts,
    amount_in: u64,
    min_amount_out: u64,
) -> EngineResult<Instruction> {
    let clock: Pubkey = SYSVAR_CLOCK_ID.parse()?;
    let token_program: Pubkey = TOKEN_PROGRAM_ID.parse()?;

    let mut data = Vec::with_capacity(17);
    data.push(1);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&min_amount_out.to_le_bytes());

    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(accounts.user, true),
            AccountMeta::new(accounts.user_source, false),
            AccountMeta::new(accounts.pool_source, false),
            AccountMeta::new(accounts.pool_destination, false),
            AccountMeta::new(accounts.user_destination, false),
            AccountMeta::new_readonly(clock, false),
            AccountMeta::new_readonly(token_program, false),
        ],
        data,
    })
}

/// Builds and signs Solana transactions for one chain.
pub struct SolanaTxBuilder {
    chain: String,
    rpc: Arc<dyn SolanaRpc>,
    degraded_mode: bool,
}

impl SolanaTxBuilder {
    pub fn new(chain: &str, rpc: Arc<dyn SolanaRpc>, degraded_mode: bool) -> Self {
        Self {
            chain: chain.to_string(),
            rpc,
            degraded_mode,
        }
    }

    pub fn degraded_mode(&self) -> bool {
        self.degraded_mode
    }

    /// Latest blockhash, or the all-zero placeholder in degraded mode.
    async fn recent_blockhash(&self) -> EngineResult<([u8; 32], bool)> {
        match self.rpc.latest_blockhash().await {
            Ok(hash) => Ok((hash, false)),
            Err(e) if self.degraded_mode => {
                tracing::warn!(chain = %self.chain, error = %e, "Using placeholder blockhash (degraded mode)");
                Ok(([0u8; 32], true))
            }
            Err(e) => Err(e),
        }
    }

    /// Sign a native SOL transfer.
    pub async fn build_transfer(
        &self,
        keypair: &SolanaKeypair,
        to: &str,
        lamports: u64,
    ) -> EngineResult<SolanaSigned> {
        if lamports == 0 {
            return Err(EngineError::InvalidAmount("amount must be positive".to_string()));
        }
        let to: Pubkey = to.parse()?;
        let from = keypair.pubkey();
        let (blockhash, placeholder_blockhash) = self.recent_blockhash().await?;

        let instruction = build_transfer_instruction(from, to, lamports);
        let compiled = Message::compile(&from, &[instruction], blockhash)?;
        let (raw, local_tx_id) = message::sign_message(keypair, &compiled)?;

        tracing::info!(
            chain = %self.chain,
            from = %from,
            to = %to,
            lamports,
            tx_hash = %local_tx_id,
            "Solana transfer signed"
        );

        Ok(SolanaSigned {
            signed: SignedTransaction {
                chain: self.chain.clone(),
                family: ChainFamily::Sol,
                local_tx_id,
                raw,
            },
            placeholder_blockhash,
        })
    }

    /// Sign an aggregator-provided base64 transaction.
    pub fn sign_serialized_transaction(
        &self,
        keypair: &SolanaKeypair,
        encoded: &str,
    ) -> EngineResult<SignedTransaction> {
        let wire = BASE64
            .decode(encoded.trim())
            .map_err(|e| EngineError::InvalidQuote(format!("transaction is not base64: {}", e)))?;
        let (raw, local_tx_id) = message::sign_serialized_transaction(&wire, keypair)?;
        tracing::info!(chain = %self.chain, tx_hash = %local_tx_id, "Aggregator Solana transaction signed");
        Ok(SignedTransaction {
            chain: self.chain.clone(),
            family: ChainFamily::Sol,
            local_tx_id,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubRpc {
        blockhash: Option<[u8; 32]>,
    }

    #[async_trait]
    impl SolanaRpc for StubRpc {
        async fn latest_blockhash(&self) -> EngineResult<[u8; 32]> {
            self.blockhash
                .ok_or_else(|| EngineError::RpcUnavailable("connection refused".into()))
        }
        async fn send_transaction(&self, _wire: &[u8]) -> EngineResult<String> {
            Err(EngineError::RpcUnavailable("not used".into()))
        }
    }

    fn keypair() -> SolanaKeypair {
        SolanaKeypair::from_key(&KeyMaterial::from_bytes(vec![21; 32])).unwrap()
    }

    #[test]
    fn test_transfer_instruction_layout() {
        let ix = build_transfer_instruction(Pubkey([1; 32]), Pubkey([2; 32]), 1_500_000);
        assert_eq!(&ix.data[..4], &[2, 0, 0, 0]);
        assert_eq!(u64::from_le_bytes(ix.data[4..12].try_into().unwrap()), 1_500_000);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn test_swap_skeleton_layout() {
        let accounts = SwapAccounts {
            user: Pubkey([1; 32]),
            user_source: Pubkey([2; 32]),
            pool_source: Pubkey([3; 32]),
            pool_destination: Pubkey([4; 32]),
            user_destination: Pubkey([5; 32]),
        };
        let ix = build_swap_instruction(Pubkey([9; 32]), &accounts, 1_000, 990).unwrap();
        assert_eq!(ix.data.len(), 17);
        assert_eq!(ix.data[0], 1);
        assert_eq!(u64::from_le_bytes(ix.data[9..17].try_into().unwrap()), 990);
        assert_eq!(ix.accounts.len(), 7);
        assert_eq!(ix.accounts[5].pubkey.to_string(), SYSVAR_CLOCK_ID);
        assert_eq!(ix.accounts[6].pubkey.to_string(), TOKEN_PROGRAM_ID);
    }

    #[test]
    fn test_materialize_checks_address() {
        let key = KeyMaterial::from_bytes(vec![21; 32]);
        let address = keypair().pubkey().to_string();
        assert!(materialize_account(&key, &address).is_ok());
        let err = materialize_account(&key, "11111111111111111111111111111111").unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_strict_mode_fails_without_blockhash() {
        let builder = SolanaTxBuilder::new("Solana", Arc::new(StubRpc { blockhash: None }), false);
        let err = builder
            .build_transfer(&keypair(), "11111111111111111111111111111111", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RpcUnavailable(_)));
    }

    #[tokio::test]
    async fn test_degraded_mode_uses_placeholder() {
        let builder = SolanaTxBuilder::new("Solana", Arc::new(StubRpc { blockhash: None }), true);
        let signed = builder
            .build_transfer(&keypair(), &Pubkey([7; 32]).to_string(), 10)
            .await
            .unwrap();
        assert!(signed.placeholder_blockhash);
        // id is the real first signature of the bytes
        assert_eq!(
            signed.signed.local_tx_id,
            bs58::encode(&signed.signed.raw[1..65]).into_string()
        );
    }

    #[tokio::test]
    async fn test_transfer_signature_covers_message() {
        let builder =
            SolanaTxBuilder::new("Solana", Arc::new(StubRpc { blockhash: Some([5; 32]) }), false);
        let keypair = keypair();
        let signed = builder
            .build_transfer(&keypair, &Pubkey([7; 32]).to_string(), 42)
            .await
            .unwrap();
        assert!(!signed.placeholder_blockhash);
        let raw = &signed.signed.raw;
        assert_eq!(raw[0], 1);
        assert_eq!(&raw[1..65], &keypair.sign(&raw[65..]));
    }
}
