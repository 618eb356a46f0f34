//! Explorer links and well-known chain names.

/// Used when a chain has no explorer configured.
pub const FALLBACK_EXPLORER: &str = "https://explorer.example.com/tx/";

/// Build a transaction link from a configured prefix and optional suffix.
pub fn explorer_url(prefix: Option<&str>, suffix: Option<&str>, tx_id: &str) -> String {
    format!(
        "{}{}{}",
        prefix.unwrap_or(FALLBACK_EXPLORER),
        tx_id,
        suffix.unwrap_or("")
    )
}

/// Display name for a numeric chain id, used in bridge messages.
pub fn well_known_chain_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("ETH"),
        5 => Some("ETH-Goerli"),
        11155111 => Some("ETH-Sepolia"),
        56 => Some("BSC"),
        97 => Some("BSC-TestNet"),
        137 => Some("Polygon"),
        80001 => Some("Polygon-Mumbai"),
        8453 => Some("Base"),
        10 => Some("Optimism"),
        42161 => Some("Arbitrum"),
        crate::config::schema::SOLANA_AGGREGATOR_CHAIN_ID => Some("Solana"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_url() {
        assert_eq!(
            explorer_url(Some("https://bscscan.com/tx/"), None, "0xabc"),
            "https://bscscan.com/tx/0xabc"
        );
        assert_eq!(
            explorer_url(Some("https://solscan.io/tx/"), Some("?cluster=devnet"), "5sig"),
            "https://solscan.io/tx/5sig?cluster=devnet"
        );
        assert_eq!(
            explorer_url(None, None, "0x1"),
            "https://explorer.example.com/tx/0x1"
        );
    }

    #[test]
    fn test_chain_names() {
        assert_eq!(well_known_chain_name(56), Some("BSC"));
        assert_eq!(well_known_chain_name(42161), Some("Arbitrum"));
        assert_eq!(well_known_chain_name(999_999), None);
    }
}
