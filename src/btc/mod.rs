//! Bitcoin testnet transaction builder.
//!
//! # Data Flow
//! ```text
//! SendRequest (satoshis)
//!     → indexer.rs (Esplora: confirmed UTXOs for the source address)
//!     → builder.rs (greedy coin selection → unsigned tx → P2PKH scriptSigs)
//!     → SignedTransaction (local id = compute_txid)
//!     → broadcast dispatcher → indexer.rs (POST /tx, returned txid is authoritative)
//! ```
//!
//! # Limitations
//! - Testnet only, P2PKH sources only
//! - Flat fee from config; no fee-rate sizing

pub mod address;
pub mod builder;
pub mod indexer;

pub use address::{is_valid_address, parse_testnet_address};
pub use builder::{select_utxos, BtcTxBuilder, CoinSelection};
pub use indexer::{BtcSubmitter, EsploraClient, Utxo, UtxoIndexer};
