//! Signed transaction representation shared by all chain families.

use crate::chains::ChainFamily;

/// Status reported for a transaction that was signed and handed to the network.
pub const STATUS_PENDING: &str = "pending";

/// Status for a Solana transaction signed against a placeholder blockhash.
pub const STATUS_UNCONFIRMED: &str = "unconfirmed";

/// A transaction signed exactly once and ready for submission.
///
/// `local_tx_id` is derived from the signed bytes before any network call
/// and never changes afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub chain: String,
    pub family: ChainFamily,
    pub local_tx_id: String,
    pub raw: Vec<u8>,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

impl std::fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("chain", &self.chain)
            .field("family", &self.family)
            .field("local_tx_id", &self.local_tx_id)
            .field("raw_len", &self.raw.len())
            .finish()
    }
}
