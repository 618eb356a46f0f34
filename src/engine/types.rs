//! Request and response types.
//!
//! All field names serialize in snake_case. Amounts are decimal strings in
//! the asset's smallest unit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Native or token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub from_address: String,
    pub to_address: String,
    pub chain: String,
    #[serde(default)]
    pub from_token: String,
    #[serde(default)]
    pub to_token: String,
    pub amount: String,
}

/// Same-chain swap. `to_address` defaults to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub from_address: String,
    #[serde(default)]
    pub to_address: Option<String>,
    pub chain: String,
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub tx_hash: String,
    pub status: String,
    pub explorer_url: String,
    pub chain: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Cross-chain quote or execution. Chain ids are aggregator chain ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeQuoteRequest {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    pub from_address: String,
    #[serde(default)]
    pub to_address: String,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub slippage: Option<String>,
}

pub type BridgeExecuteRequest = BridgeQuoteRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeQuoteResponse {
    pub transaction_request: Value,
    pub estimate: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeExecuteResponse {
    pub tx_hash: String,
    pub status: String,
    pub explorer_url: String,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatusRequest {
    pub tx_hash: String,
    #[serde(default)]
    pub from_chain_id: Option<u64>,
    #[serde(default)]
    pub to_chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_tx_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_tx_link: Option<String>,
}

/// `amount` of `"max"` or empty means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub token_address: String,
    pub owner_address: String,
    pub spender_address: String,
    pub chain: String,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub token_address: String,
    pub owner_address: String,
    pub spender_address: String,
    pub chain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub tx_hash: String,
    pub amount: String,
    pub status: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAllowanceRequest {
    pub token_address: String,
    pub owner_address: String,
    pub spender_address: String,
    pub chain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub allowance: String,
    pub is_unlimited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListApprovalsRequest {
    pub owner_address: String,
    pub chain: String,
    pub tokens: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_default() {
        let req: SwapRequest = serde_json::from_str(
            r#"{"from_address":"0xabc","chain":"BSC","from_token":"USDT","to_token":"","amount":"10"}"#,
        )
        .unwrap();
        assert!(req.to_address.is_none());

        let approve: ApproveRequest = serde_json::from_str(
            r#"{"token_address":"0x1","owner_address":"0x2","spender_address":"0x3","chain":"BSC"}"#,
        )
        .unwrap();
        assert!(approve.amount.is_none());
    }

    #[test]
    fn test_empty_warnings_are_omitted() {
        let resp = TransactionResponse {
            tx_hash: "0x1".into(),
            status: "pending".into(),
            explorer_url: "https://bscscan.com/tx/0x1".into(),
            chain: "BSC".into(),
            message: "submitted".into(),
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("warnings").is_none());
        assert_eq!(json["explorer_url"], "https://bscscan.com/tx/0x1");
    }
}
