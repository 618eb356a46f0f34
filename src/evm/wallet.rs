//! EVM signing wallet.
//!
//! # Security
//! - Key bytes come from a `KeyProvider` and are dropped after parsing
//! - Keys are never logged or serialized
//! - Signing is EIP-155 legacy with the wallet's chain id

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::chains::ChainFamily;
use crate::error::{EngineError, EngineResult};
use crate::keys::KeyMaterial;
use crate::transaction::SignedTransaction;

/// Wallet for one address on one chain.
#[derive(Debug, Clone)]
pub struct EvmWallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl EvmWallet {
    /// Create a wallet from 32 raw key bytes.
    pub fn from_key(key: &KeyMaterial, chain_id: u64) -> EngineResult<Self> {
        let signer = PrivateKeySigner::from_slice(key.as_bytes())
            .map_err(|e| EngineError::Key(format!("Invalid EVM private key: {}", e)))?;
        Ok(Self { signer, chain_id })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Fail unless the key controls `expected`.
    pub fn ensure_address(&self, expected: Address) -> EngineResult<()> {
        if self.address() != expected {
            return Err(EngineError::InvalidAddress(format!(
                "key for {} does not control {}",
                self.address(),
                expected
            )));
        }
        Ok(())
    }

    /// Sign a legacy transaction and encode it for `eth_sendRawTransaction`.
    ///
    /// The returned local id is the keccak256 hash of the signed envelope,
    /// which is what the network reports for the same bytes.
    pub fn sign_legacy(&self, chain: &str, mut tx: TxLegacy) -> EngineResult<SignedTransaction> {
        tx.chain_id = Some(self.chain_id);
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| EngineError::SignFailed(e.to_string()))?;
        let signed = tx.into_signed(signature);
        let local_tx_id = format!("{:#x}", signed.hash());
        let raw = TxEnvelope::Legacy(signed).encoded_2718();

        Ok(SignedTransaction {
            chain: chain.to_string(),
            family: ChainFamily::Evm,
            local_tx_id,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::transaction::SignerRecoverable;
    use alloy::consensus::Transaction;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::{address, TxKind, U256};

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn wallet(chain_id: u64) -> EvmWallet {
        let key = KeyMaterial::parse(TEST_PRIVATE_KEY).unwrap();
        EvmWallet::from_key(&key, chain_id).unwrap()
    }

    #[test]
    fn test_wallet_from_key() {
        let wallet = wallet(1);
        assert_eq!(
            wallet.address(),
            address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266")
        );
        assert_eq!(wallet.chain_id(), 1);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let key = KeyMaterial::from_bytes(vec![0u8; 31]);
        assert!(EvmWallet::from_key(&key, 1).is_err());
    }

    #[test]
    fn test_ensure_address() {
        let wallet = wallet(1);
        assert!(wallet
            .ensure_address(address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"))
            .is_ok());
        let err = wallet.ensure_address(Address::ZERO).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddress(_)));
    }

    #[test]
    fn test_sign_legacy_is_decodable() {
        let wallet = wallet(97);
        let tx = TxLegacy {
            chain_id: None,
            nonce: 4,
            gas_price: 10_000_000_000,
            gas_limit: 23_100,
            to: TxKind::Call(Address::ZERO),
            value: U256::from(1_000u64),
            input: Default::default(),
        };
        let signed = wallet.sign_legacy("BSC-TestNet", tx).unwrap();
        assert_eq!(signed.family, ChainFamily::Evm);
        assert!(signed.local_tx_id.starts_with("0x"));
        assert_eq!(signed.local_tx_id.len(), 66);

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_slice()).unwrap();
        assert_eq!(format!("{:#x}", decoded.tx_hash()), signed.local_tx_id);
        assert_eq!(decoded.nonce(), 4);
        assert_eq!(decoded.chain_id(), Some(97));
        assert_eq!(
            decoded.recover_signer().unwrap(),
            address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266")
        );
    }
}
