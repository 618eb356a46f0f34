//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check chain registry integrity (unique names and aliases, EVM chain ids)
//! - Validate value ranges (timeouts > 0, attempts > 0, fee > 0)
//! - Validate endpoint URLs and slippage
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::chains::ChainFamily;
use crate::config::schema::EngineConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.chains.is_empty() {
        errors.push(ValidationError::new("chains", "at least one chain is required"));
    }

    let mut seen_names: HashSet<String> = HashSet::new();
    for (i, chain) in config.chains.iter().enumerate() {
        let field = format!("chains[{}]", i);

        if chain.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        }

        for name in std::iter::once(&chain.name).chain(chain.aliases.iter()) {
            if !seen_names.insert(name.to_ascii_lowercase()) {
                errors.push(ValidationError::new(
                    format!("{}.name", field),
                    format!("'{}' is already used by another chain", name),
                ));
            }
        }

        for url in std::iter::once(&chain.rpc_url).chain(chain.failover_urls.iter()) {
            if url::Url::parse(url).is_err() {
                errors.push(ValidationError::new(
                    format!("{}.rpc_url", field),
                    format!("'{}' is not a valid URL", url),
                ));
            }
        }

        if chain.family == ChainFamily::Evm && chain.chain_id.is_none() {
            errors.push(ValidationError::new(
                format!("{}.chain_id", field),
                "EVM chains require a chain_id",
            ));
        }

        if chain.dex_router.is_some() != chain.wrapped_native.is_some() {
            errors.push(ValidationError::new(
                format!("{}.dex_router", field),
                "dex_router and wrapped_native must be set together",
            ));
        }
    }

    if url::Url::parse(&config.aggregator.api_url).is_err() {
        errors.push(ValidationError::new("aggregator.api_url", "not a valid URL"));
    }
    if config.aggregator.timeout_secs == 0 {
        errors.push(ValidationError::new("aggregator.timeout_secs", "must be > 0"));
    }
    match config.aggregator.default_slippage.parse::<f64>() {
        Ok(s) if s > 0.0 && s < 1.0 => {}
        _ => errors.push(ValidationError::new(
            "aggregator.default_slippage",
            "must be a fraction between 0 and 1",
        )),
    }

    if config.evm.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("evm.rpc_timeout_secs", "must be > 0"));
    }
    if config.allowance.check_attempts == 0 {
        errors.push(ValidationError::new("allowance.check_attempts", "must be > 0"));
    }
    if config.allowance.receipt_poll_secs == 0 {
        errors.push(ValidationError::new("allowance.receipt_poll_secs", "must be > 0"));
    }
    if config.allowance.receipt_timeout_secs < config.allowance.receipt_poll_secs {
        errors.push(ValidationError::new(
            "allowance.receipt_timeout_secs",
            "must be at least receipt_poll_secs",
        ));
    }
    if config.bridge.status_poll_interval_secs == 0 {
        errors.push(ValidationError::new("bridge.status_poll_interval_secs", "must be > 0"));
    }
    if config.bridge.status_max_attempts == 0 {
        errors.push(ValidationError::new("bridge.status_max_attempts", "must be > 0"));
    }
    if config.btc.fee_sats == 0 {
        errors.push(ValidationError::new("btc.fee_sats", "must be > 0"));
    }
    if config.solana.swap_program_id.is_empty() {
        errors.push(ValidationError::new("solana.swap_program_id", "must not be empty"));
    }
    if config.broadcast.max_attempts == 0 {
        errors.push(ValidationError::new("broadcast.max_attempts", "must be > 0"));
    }
    if config.broadcast.outcome_capacity == 0 {
        errors.push(ValidationError::new("broadcast.outcome_capacity", "must be > 0"));
    }
    if config.broadcast.max_in_flight == 0 {
        errors.push(ValidationError::new("broadcast.max_in_flight", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = EngineConfig::default();
        config.btc.fee_sats = 0;
        config.broadcast.max_attempts = 0;
        config.aggregator.default_slippage = "5".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "btc.fee_sats"));
        assert!(errors.iter().any(|e| e.field == "aggregator.default_slippage"));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut config = EngineConfig::default();
        let mut clash = config.chains[0].clone();
        clash.name = "Mainnet".to_string();
        clash.aliases = vec!["bsc".to_string()];
        config.chains.push(clash);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("'bsc'")));
    }

    #[test]
    fn test_evm_chain_requires_chain_id() {
        let mut config = EngineConfig::default();
        config.chains[0].chain_id = None;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "chains[0].chain_id"));
    }
}
