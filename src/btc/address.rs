//! Bitcoin address checks.

use std::str::FromStr;

use bitcoin::{Address, Network};

use crate::error::{EngineError, EngineResult};

const KNOWN_PREFIXES: &[&str] = &["tb1", "bc1", "m", "n", "2", "1", "3"];

/// Cheap shape check on a request address.
///
/// Only the prefix and length are inspected. Checksums and network are
/// verified later by `parse_testnet_address` when the output script is built.
pub fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    address.len() >= 26 && KNOWN_PREFIXES.iter().any(|p| address.starts_with(p))
}

/// Fully parse an address and require it to be a testnet address.
pub fn parse_testnet_address(address: &str) -> EngineResult<Address> {
    Address::from_str(address.trim())
        .map_err(|e| EngineError::InvalidAddress(format!("{}: {}", address, e)))?
        .require_network(Network::Testnet)
        .map_err(|e| EngineError::InvalidAddress(format!("{}: {}", address, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_check() {
        assert!(is_valid_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
        assert!(is_valid_address("2MzQwSSnBHWHqSAqtTVQ6v47XtaisrJa1Vc"));
        assert!(!is_valid_address("mshort"));
        assert!(!is_valid_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert!(!is_valid_address(""));
    }

    fn derived(network: Network) -> String {
        let secp = bitcoin::secp256k1::Secp256k1::new();
        let key = bitcoin::PrivateKey::from_slice(&[1u8; 32], network).unwrap();
        Address::p2pkh(key.public_key(&secp).pubkey_hash(), network).to_string()
    }

    #[test]
    fn test_parse_requires_testnet() {
        let testnet = derived(Network::Testnet);
        assert!(is_valid_address(&testnet));
        assert!(parse_testnet_address(&testnet).is_ok());

        let mainnet = derived(Network::Bitcoin);
        assert!(matches!(
            parse_testnet_address(&mainnet),
            Err(EngineError::InvalidAddress(_))
        ));
        assert!(parse_testnet_address("mxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx").is_err());
    }
}
