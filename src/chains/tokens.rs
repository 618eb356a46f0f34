//! Native-token sentinels and token symbol resolution.
//!
//! Requests spell "the native asset" in several ways. Each family has one
//! canonical marker and every recognized spelling maps onto it before a
//! transaction is built or a quote is requested.

use crate::chains::ChainFamily;

/// Canonical EVM native marker understood by the aggregator.
pub const EVM_NATIVE: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// Zero address, also used as a native sentinel.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Solana system program; canonical SOL marker.
pub const SOL_NATIVE: &str = "11111111111111111111111111111111";

/// Canonical Bitcoin marker.
pub const BTC_NATIVE: &str = "bitcoin";

/// Wrapped SOL mint.
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

const SOLANA_SYMBOLS: &[(&str, &str)] = &[
    ("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    ("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
    ("WSOL", WSOL_MINT),
];

/// Map any recognized native spelling to the family's canonical marker.
///
/// Other tokens are returned trimmed and otherwise unchanged, so the
/// function is idempotent.
pub fn normalize_native_token(family: ChainFamily, token: &str) -> String {
    let token = token.trim();
    if is_native_token(family, token) {
        canonical_native(family).to_string()
    } else {
        token.to_string()
    }
}

/// Whether `token` names the family's native asset.
pub fn is_native_token(family: ChainFamily, token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() || token.eq_ignore_ascii_case(ZERO_ADDRESS) {
        return true;
    }
    match family {
        ChainFamily::Evm => token.eq_ignore_ascii_case(EVM_NATIVE),
        ChainFamily::Sol => token == SOL_NATIVE || token.eq_ignore_ascii_case("SOL"),
        ChainFamily::Btc => {
            token.eq_ignore_ascii_case(BTC_NATIVE) || token.eq_ignore_ascii_case("BTC")
        }
    }
}

pub fn canonical_native(family: ChainFamily) -> &'static str {
    match family {
        ChainFamily::Evm => EVM_NATIVE,
        ChainFamily::Sol => SOL_NATIVE,
        ChainFamily::Btc => BTC_NATIVE,
    }
}

/// Resolve a token for aggregator requests: native normalization plus
/// well-known Solana symbols.
pub fn resolve_token(family: ChainFamily, token: &str) -> String {
    let normalized = normalize_native_token(family, token);
    if family == ChainFamily::Sol {
        if let Some((_, mint)) = SOLANA_SYMBOLS
            .iter()
            .find(|(symbol, _)| symbol.eq_ignore_ascii_case(&normalized))
        {
            return mint.to_string();
        }
    }
    normalized
}

/// Whether two token spellings name the same asset on one family.
///
/// EVM hex addresses compare case-insensitively; base58 mints do not.
pub fn same_token(family: ChainFamily, a: &str, b: &str) -> bool {
    let a = resolve_token(family, a);
    let b = resolve_token(family, b);
    match family {
        ChainFamily::Evm | ChainFamily::Btc => a.eq_ignore_ascii_case(&b),
        ChainFamily::Sol => a == b,
    }
}
