//! EVM transaction builder subsystem.
//!
//! # Data Flow
//! ```text
//! KeyProvider bytes
//!     → wallet.rs (PrivateKeySigner, address check, EIP-155 legacy signing)
//! TransactionIntent
//!     → builder.rs (nonce lane → gas price → gas policy → TxLegacy → sign)
//!     → SignedTransaction (local id = keccak256 of the signed envelope)
//!     → broadcast dispatcher → rpc.rs (EvmRpc) → client.rs (alloy providers with failover)
//! ```
//!
//! # Security Constraints
//! - The signing address must match the requested sender
//! - Never log private keys or raw signed payloads
//! - All RPC calls have configurable timeouts

pub mod abi;
pub mod builder;
pub mod client;
pub mod nonce;
pub mod rpc;
pub mod wallet;

pub use builder::{EvmTxBuilder, GasPolicy, PreparedTx};
pub use client::EvmClient;
pub use nonce::NonceTracker;
pub use rpc::{EvmRpc, EvmSubmitter};
pub use wallet::EvmWallet;

use alloy::primitives::Address;

use crate::error::{EngineError, EngineResult};

/// Parse a hex address, case-insensitively. Checksums are not enforced.
pub fn parse_address(address: &str) -> EngineResult<Address> {
    let trimmed = address.trim();
    trimmed
        .to_ascii_lowercase()
        .parse::<Address>()
        .map_err(|_| EngineError::InvalidAddress(format!("'{}' is not an EVM address", trimmed)))
}
