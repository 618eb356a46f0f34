//! Solana transaction builder.
//!
//! # Data Flow
//! ```text
//! KeyProvider bytes
//!     → keypair.rs (ed25519 seed, checked against from_address)
//! SendRequest (lamports)
//!     → builder.rs (system transfer instruction)
//!     → message.rs (legacy message compile: account ordering, header, compact lengths)
//!     → rpc.rs (getLatestBlockhash, sendTransaction)
//!     → SignedTransaction (local id = base58 of the first signature)
//! Aggregator payload (base64)
//!     → message.rs (sign_serialized_transaction: place our signature in its slot)
//! ```
//!
//! # Limitations
//! - Native DEX swaps are not submitted; `build_swap_instruction` is an integration skeleton
//! - Degraded mode (opt-in) tolerates blockhash and send failures

pub mod builder;
pub mod keypair;
pub mod message;
pub mod rpc;

use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

pub use builder::{
    build_swap_instruction, build_transfer_instruction, materialize_account, SolanaSigned,
    SolanaTxBuilder, SwapAccounts,
};
pub use keypair::SolanaKeypair;
pub use message::{AccountMeta, Instruction};
pub use rpc::{SolanaRpc, SolanaRpcClient, SolanaSubmitter};

/// System program, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0u8; 32]);
/// SPL Token program.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// Clock sysvar.
pub const SYSVAR_CLOCK_ID: &str = "SysvarC1ock11111111111111111111111111111111";

/// A 32-byte Solana account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for Pubkey {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| EngineError::InvalidAddress(format!("{}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            EngineError::InvalidAddress(format!("{}: expected 32 bytes, got {}", s, v.len()))
        })?;
        Ok(Pubkey(bytes))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}
