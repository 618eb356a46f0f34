//! Integer amount parsing.
//!
//! Amounts cross the boundary as decimal strings in the asset's smallest
//! unit. They are parsed straight into integers and never touch floating
//! point.

use alloy::primitives::U256;

use crate::error::{EngineError, EngineResult};

/// Parse a decimal amount into `U256`.
pub fn parse_u256(amount: &str) -> EngineResult<U256> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::InvalidAmount(format!(
            "'{}' is not a decimal integer",
            amount
        )));
    }
    U256::from_str_radix(amount, 10)
        .map_err(|e| EngineError::InvalidAmount(format!("'{}': {}", amount, e)))
}

/// Parse a decimal amount that must be greater than zero.
pub fn parse_positive_u256(amount: &str) -> EngineResult<U256> {
    let value = parse_u256(amount)?;
    if value.is_zero() {
        return Err(EngineError::InvalidAmount("amount must be positive".to_string()));
    }
    Ok(value)
}

/// Parse a decimal amount into `u64` (satoshis, lamports).
pub fn parse_u64(amount: &str) -> EngineResult<u64> {
    let value = parse_u256(amount)?;
    u64::try_from(value)
        .map_err(|_| EngineError::InvalidAmount(format!("'{}' exceeds u64", amount.trim())))
}

/// Parse a JSON-RPC style quantity: `0x`-prefixed hex or plain decimal.
pub fn parse_quantity(value: &str) -> EngineResult<U256> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some("") => Ok(U256::ZERO),
        Some(hex) => U256::from_str_radix(hex, 16)
            .map_err(|e| EngineError::InvalidAmount(format!("'{}': {}", value, e))),
        None => parse_u256(value),
    }
}

/// `"max"` or an empty string means the largest representable amount.
pub fn parse_approve_amount(amount: Option<&str>) -> EngineResult<U256> {
    match amount.map(str::trim) {
        None | Some("") => Ok(U256::MAX),
        Some(a) if a.eq_ignore_ascii_case("max") => Ok(U256::MAX),
        Some(a) => parse_u256(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u256() {
        assert_eq!(
            parse_u256("1000000000000000000").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert!(parse_u256("1.5").is_err());
        assert!(parse_u256("-1").is_err());
        assert!(parse_u256("1e18").is_err());
        assert!(parse_u256("").is_err());
    }

    #[test]
    fn test_parse_u256_beyond_u128() {
        let max = U256::MAX.to_string();
        assert_eq!(parse_u256(&max).unwrap(), U256::MAX);
    }

    #[test]
    fn test_parse_positive_rejects_zero() {
        assert_eq!(parse_positive_u256("15").unwrap(), U256::from(15));
        assert!(matches!(parse_positive_u256("0"), Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_u64_bounds() {
        assert_eq!(parse_u64("5000").unwrap(), 5000);
        assert!(parse_u64("18446744073709551616").is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x5208").unwrap(), U256::from(21000u64));
        assert_eq!(parse_quantity("21000").unwrap(), U256::from(21000u64));
        assert_eq!(parse_quantity("0x").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_approve_amount() {
        assert_eq!(parse_approve_amount(Some("max")).unwrap(), U256::MAX);
        assert_eq!(parse_approve_amount(Some("")).unwrap(), U256::MAX);
        assert_eq!(parse_approve_amount(None).unwrap(), U256::MAX);
        assert_eq!(parse_approve_amount(Some("42")).unwrap(), U256::from(42u64));
    }
}
