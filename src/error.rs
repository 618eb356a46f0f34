//! Engine-wide error taxonomy.

use thiserror::Error;

/// Errors that can occur while building, signing, or submitting transactions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Chain name or id did not resolve to a configured chain.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Address failed to parse, or does not match the key it claims.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Amount is not a non-negative integer in the asset's smallest unit.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Same-token swap, native-to-native swap, or an operation the family lacks.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Spendable balance cannot cover amount plus fee.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Chain RPC or indexer unreachable.
    #[error("RPC unavailable: {0}")]
    RpcUnavailable(String),

    /// Gas estimate failed. Callers fall back to a default limit.
    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    /// Pending nonce could not be fetched.
    #[error("Nonce fetch failed: {0}")]
    NonceFetchFailed(String),

    /// Key provider has no usable key for the address.
    #[error("Key error: {0}")]
    Key(String),

    /// Local signing failed.
    #[error("Signing failed: {0}")]
    SignFailed(String),

    /// Approve transaction reverted or never became effective.
    #[error("Approve failed: {0}")]
    ApproveFailed(String),

    /// Aggregator response is missing the transaction payload.
    #[error("Invalid quote: {0}")]
    InvalidQuote(String),

    /// Aggregator transport failure or non-success status.
    #[error("Aggregator error (status {status}): {body}")]
    Aggregator { status: u16, body: String },

    /// Submission failed after all retry attempts.
    #[error("Broadcast failed after {attempts} attempts: {reason}")]
    BroadcastFailed { attempts: u32, reason: String },

    /// Path exists only as an integration point.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl EngineError {
    /// Stable label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnsupportedChain(_) => "unsupported_chain",
            EngineError::InvalidAddress(_) => "invalid_address",
            EngineError::InvalidAmount(_) => "invalid_amount",
            EngineError::InvalidOperation(_) => "invalid_operation",
            EngineError::InsufficientFunds { .. } => "insufficient_funds",
            EngineError::RpcUnavailable(_) => "rpc_unavailable",
            EngineError::GasEstimationFailed(_) => "gas_estimation_failed",
            EngineError::NonceFetchFailed(_) => "nonce_fetch_failed",
            EngineError::Key(_) => "key",
            EngineError::SignFailed(_) => "sign_failed",
            EngineError::ApproveFailed(_) => "approve_failed",
            EngineError::InvalidQuote(_) => "invalid_quote",
            EngineError::Aggregator { .. } => "aggregator",
            EngineError::BroadcastFailed { .. } => "broadcast_failed",
            EngineError::NotImplemented(_) => "not_implemented",
        }
    }

    /// Whether another attempt at the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::RpcUnavailable(_)
                | EngineError::NonceFetchFailed(_)
                | EngineError::Aggregator { status: 0 | 429 | 500..=599, .. }
        )
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InsufficientFunds {
            required: 15_000,
            available: 9_000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 15000, available 9000"
        );

        let err = EngineError::BroadcastFailed {
            attempts: 3,
            reason: "connection refused".into(),
        };
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::RpcUnavailable("down".into()).is_transient());
        assert!(EngineError::Aggregator {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!EngineError::Aggregator {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!EngineError::SignFailed("bad key".into()).is_transient());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            EngineError::InvalidOperation("same token".into()).kind(),
            "invalid_operation"
        );
        assert_eq!(
            EngineError::NotImplemented("x".into()).kind(),
            "not_implemented"
        );
    }
}
