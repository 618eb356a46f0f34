//! Coin selection and P2PKH signing.

use std::str::FromStr;

use bitcoin::address::AddressType;
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, PrivateKey, ScriptBuf, Sequence, Transaction, TxIn, TxOut,
    Txid, Witness,
};

use crate::btc::address::parse_testnet_address;
use crate::btc::indexer::Utxo;
use crate::chains::ChainFamily;
use crate::error::{EngineError, EngineResult};
use crate::keys::KeyMaterial;
use crate::transaction::SignedTransaction;

/// Inputs chosen to cover amount plus fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub inputs: Vec<Utxo>,
    pub total: u64,
    pub change: u64,
}

/// Greedy selection over confirmed UTXOs, in the order given.
pub fn select_utxos(utxos: &[Utxo], amount: u64, fee: u64) -> EngineResult<CoinSelection> {
    let required = amount
        .checked_add(fee)
        .ok_or_else(|| EngineError::InvalidAmount("amount plus fee overflows".to_string()))?;

    let mut inputs = Vec::new();
    let mut total: u64 = 0;
    for utxo in utxos.iter().filter(|u| u.confirmed) {
        inputs.push(utxo.clone());
        total = total.saturating_add(utxo.value_sats);
        if total >= required {
            return Ok(CoinSelection {
                inputs,
                total,
                change: total - required,
            });
        }
    }

    Err(EngineError::InsufficientFunds {
        required,
        available: total,
    })
}

/// Builds and signs BTC testnet transactions from a P2PKH source.
#[derive(Debug, Clone, Copy)]
pub struct BtcTxBuilder {
    fee_sats: u64,
}

impl BtcTxBuilder {
    pub fn new(fee_sats: u64) -> Self {
        Self { fee_sats }
    }

    pub fn fee_sats(&self) -> u64 {
        self.fee_sats
    }

    /// Select coins, build, and sign. No network access.
    pub fn build_signed(
        &self,
        chain: &str,
        key: &KeyMaterial,
        from: &str,
        to: &str,
        amount: u64,
        utxos: &[Utxo],
    ) -> EngineResult<SignedTransaction> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount("amount must be positive".to_string()));
        }
        let from_address = parse_testnet_address(from)?;
        let to_address = parse_testnet_address(to)?;
        let private_key = source_key(key, &from_address)?;

        let selection = select_utxos(utxos, amount, self.fee_sats)?;
        let mut tx = build_raw_transaction(&selection, &from_address, &to_address, amount)?;
        let prev_scripts = selection
            .inputs
            .iter()
            .map(|u| {
                hex::decode(&u.script_pubkey_hex)
                    .map(ScriptBuf::from_bytes)
                    .map_err(|e| EngineError::InvalidAddress(format!("bad script for {}: {}", u.txid, e)))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        sign_inputs(&mut tx, &private_key, &prev_scripts)?;

        let txid = tx.compute_txid().to_string();
        tracing::info!(
            chain = %chain,
            from = %from,
            to = %to,
            amount,
            fee = self.fee_sats,
            inputs = selection.inputs.len(),
            change = selection.change,
            tx_hash = %txid,
            "BTC transaction signed"
        );

        Ok(SignedTransaction {
            chain: chain.to_string(),
            family: ChainFamily::Btc,
            local_tx_id: txid,
            raw: bitcoin::consensus::encode::serialize(&tx),
        })
    }
}

/// Parse the key and check it controls the P2PKH source address.
fn source_key(key: &KeyMaterial, from: &Address) -> EngineResult<PrivateKey> {
    if from.address_type() != Some(AddressType::P2pkh) {
        return Err(EngineError::InvalidAddress(format!(
            "{} is not a P2PKH address",
            from
        )));
    }
    let private_key = PrivateKey::from_slice(key.as_bytes(), Network::Testnet)
        .map_err(|e| EngineError::Key(format!("invalid BTC private key: {}", e)))?;
    let secp = Secp256k1::signing_only();
    let derived = Address::p2pkh(private_key.public_key(&secp).pubkey_hash(), Network::Testnet);
    if &derived != from {
        return Err(EngineError::InvalidAddress(format!(
            "key for {} does not control {}",
            derived, from
        )));
    }
    Ok(private_key)
}

/// Unsigned transaction: one input per selected UTXO, payment output, optional change.
pub fn build_raw_transaction(
    selection: &CoinSelection,
    from: &Address,
    to: &Address,
    amount: u64,
) -> EngineResult<Transaction> {
    let input = selection
        .inputs
        .iter()
        .map(|u| {
            let txid = Txid::from_str(&u.txid)
                .map_err(|e| EngineError::InvalidOperation(format!("bad utxo txid {}: {}", u.txid, e)))?;
            Ok(TxIn {
                previous_output: OutPoint { txid, vout: u.vout },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let mut output = vec![TxOut {
        value: Amount::from_sat(amount),
        script_pubkey: to.script_pubkey(),
    }];
    if selection.change > 0 {
        output.push(TxOut {
            value: Amount::from_sat(selection.change),
            script_pubkey: from.script_pubkey(),
        });
    }

    Ok(Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input,
        output,
    })
}

/// Fill every input's scriptSig with `<sig||SIGHASH_ALL> <pubkey>`.
///
/// All sighashes are computed before any input is modified.
pub fn sign_inputs(
    tx: &mut Transaction,
    key: &PrivateKey,
    prev_scripts: &[ScriptBuf],
) -> EngineResult<()> {
    if prev_scripts.len() != tx.input.len() {
        return Err(EngineError::SignFailed(format!(
            "{} inputs but {} previous scripts",
            tx.input.len(),
            prev_scripts.len()
        )));
    }

    let secp = Secp256k1::signing_only();
    let public_key = key.public_key(&secp);

    let sighashes = {
        let cache = SighashCache::new(&*tx);
        prev_scripts
            .iter()
            .enumerate()
            .map(|(i, script)| {
                cache
                    .legacy_signature_hash(i, script, EcdsaSighashType::All.to_u32())
                    .map_err(|e| EngineError::SignFailed(format!("sighash for input {}: {}", i, e)))
            })
            .collect::<EngineResult<Vec<_>>>()?
    };

    for (input, sighash) in tx.input.iter_mut().zip(sighashes) {
        let message = Message::from_digest(sighash.to_byte_array());
        let signature = bitcoin::ecdsa::Signature::sighash_all(secp.sign_ecdsa(&message, &key.inner));
        let push = PushBytesBuf::try_from(signature.to_vec())
            .map_err(|e| EngineError::SignFailed(e.to_string()))?;
        input.script_sig = Builder::new()
            .push_slice(push)
            .push_key(&public_key)
            .into_script();
    }
    Ok(())
}
