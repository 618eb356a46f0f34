//! Legacy message compilation and transaction wire format.
//!
//! Wire layout:
//! ```text
//! transaction = compact(n) signature[n] message
//! message     = [0x80 | version]? header[3] compact(k) key[k] blockhash[32]
//!               compact(m) instruction[m]
//! instruction = program_index u8, compact(a) account_index[a], compact(d) data[d]
//! ```

use crate::error::{EngineError, EngineResult};
use crate::solana::keypair::SolanaKeypair;
use crate::solana::Pubkey;

pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompiledInstruction {
    program_id_index: u8,
    accounts: Vec<u8>,
    data: Vec<u8>,
}

/// A compiled legacy message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// `[required signatures, readonly signed, readonly unsigned]`
    pub header: [u8; 3],
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Order accounts as payer, writable signers, readonly signers,
    /// writable non-signers, readonly non-signers. Duplicate keys merge flags.
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: [u8; 32],
    ) -> EngineResult<Self> {
        let mut metas: Vec<AccountMeta> = vec![AccountMeta::new(*payer, true)];
        let mut merge = |meta: AccountMeta| {
            if let Some(existing) = metas.iter_mut().find(|m| m.pubkey == meta.pubkey) {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            } else {
                metas.push(meta);
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(*meta);
            }
            merge(AccountMeta::new_readonly(ix.program_id, false));
        }

        let group = |m: &AccountMeta| match (m.is_signer, m.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        // stable sort keeps the payer ahead of the other writable signers
        metas.sort_by_key(group);

        if metas.len() > 256 {
            return Err(EngineError::InvalidOperation(format!(
                "message needs {} accounts, at most 256 fit",
                metas.len()
            )));
        }

        let count = |g: u8| metas.iter().filter(|m| group(*m) == g).count() as u8;
        let header = [count(0) + count(1), count(1), count(3)];
        let account_keys: Vec<Pubkey> = metas.iter().map(|m| m.pubkey).collect();
        let index_of = |key: &Pubkey| -> EngineResult<u8> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| EngineError::InvalidOperation(format!("account {} not compiled", key)))
        };

        let instructions = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|m| index_of(&m.pubkey))
                        .collect::<EngineResult<Vec<_>>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    pub fn num_required_signatures(&self) -> usize {
        self.header[0] as usize
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.header);
        encode_compact_u16(self.account_keys.len(), &mut out);
        for key in &self.account_keys {
            out.extend_from_slice(&key.0);
        }
        out.extend_from_slice(&self.recent_blockhash);
        encode_compact_u16(self.instructions.len(), &mut out);
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_compact_u16(ix.accounts.len(), &mut out);
            out.extend_from_slice(&ix.accounts);
            encode_compact_u16(ix.data.len(), &mut out);
            out.extend_from_slice(&ix.data);
        }
        out
    }
}

/// Solana's "shortvec" length prefix.
pub fn encode_compact_u16(mut value: usize, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Returns `(value, bytes consumed)`.
pub fn decode_compact_u16(bytes: &[u8]) -> EngineResult<(usize, usize)> {
    let mut value = 0usize;
    for (i, byte) in bytes.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(EngineError::InvalidQuote("malformed compact-u16 length".to_string()))
}

/// Wire bytes for a transaction.
pub fn serialize_transaction(signatures: &[[u8; SIGNATURE_LEN]], message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + signatures.len() * SIGNATURE_LEN + message.len());
    encode_compact_u16(signatures.len(), &mut out);
    for sig in signatures {
        out.extend_from_slice(sig);
    }
    out.extend_from_slice(message);
    out
}

/// Sign a payer-only message and serialize it.
///
/// Returns the wire bytes and the transaction id (base58 first signature).
pub fn sign_message(keypair: &SolanaKeypair, message: &Message) -> EngineResult<(Vec<u8>, String)> {
    if message.num_required_signatures() != 1 {
        return Err(EngineError::SignFailed(format!(
            "message needs {} signatures, only the payer signs",
            message.num_required_signatures()
        )));
    }
    let bytes = message.serialize();
    let signature = keypair.sign(&bytes);
    let id = bs58::encode(signature).into_string();
    Ok((serialize_transaction(&[signature], &bytes), id))
}

/// Sign a transaction serialized elsewhere (legacy or v0) in our signer slot.
///
/// Returns the updated wire bytes and the base58 first signature.
pub fn sign_serialized_transaction(
    wire: &[u8],
    keypair: &SolanaKeypair,
) -> EngineResult<(Vec<u8>, String)> {
    let invalid = |msg: &str| EngineError::InvalidQuote(format!("serialized transaction: {}", msg));

    let (sig_count, prefix) = decode_compact_u16(wire)?;
    let message_start = prefix + sig_count * SIGNATURE_LEN;
    if wire.len() <= message_start {
        return Err(invalid("truncated before message"));
    }
    let message = &wire[message_start..];

    let header_start = if message[0] & 0x80 != 0 { 1 } else { 0 };
    if message.len() < header_start + 3 {
        return Err(invalid("truncated header"));
    }
    let required = message[header_start] as usize;
    if required > sig_count {
        return Err(invalid("fewer signature slots than required signers"));
    }

    let keys_at = header_start + 3;
    let (key_count, key_prefix) = decode_compact_u16(&message[keys_at..])?;
    let keys_start = keys_at + key_prefix;
    if message.len() < keys_start + key_count * 32 {
        return Err(invalid("truncated account keys"));
    }
    let ours = keypair.pubkey();
    let slot = (0..required.min(key_count))
        .find(|i| message[keys_start + i * 32..keys_start + (i + 1) * 32] == ours.0)
        .ok_or_else(|| invalid(&format!("{} is not a required signer", ours)))?;

    let signature = keypair.sign(message);
    let mut signed = wire.to_vec();
    let at = prefix + slot * SIGNATURE_LEN;
    signed[at..at + SIGNATURE_LEN].copy_from_slice(&signature);

    let id = bs58::encode(&signed[prefix..prefix + SIGNATURE_LEN]).into_string();
    Ok((signed, id))
}
