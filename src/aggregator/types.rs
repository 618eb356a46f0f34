//! Quote and status types.

use alloy::primitives::U256;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::amount::parse_quantity;
use crate::error::{EngineError, EngineResult};

/// Which step timing parameter a quote request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Swap,
    Bridge,
}

/// Parameters for `GET /quote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub kind: QuoteKind,
    pub from_chain: u64,
    pub to_chain: u64,
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    pub from_address: String,
    pub to_address: Option<String>,
    pub order: Option<String>,
    pub slippage: Option<String>,
}

/// An executable route. Not `Clone`: executing it consumes it.
#[derive(Debug)]
pub struct Quote {
    pub id: Uuid,
    pub tool: String,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    /// Contract to call (EVM only).
    pub to_contract: Option<String>,
    /// Hex call data (EVM) or base64 serialized transaction (Solana).
    pub call_data: String,
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub approval_address: Option<String>,
    pub from_amount: String,
    pub to_amount: String,
    pub to_amount_min: String,
    pub gas_costs: Value,
    /// Raw `transactionRequest` as returned.
    pub transaction_request: Value,
    /// Raw `estimate` as returned.
    pub estimate: Value,
}

fn quantity(value: &Value) -> EngineResult<Option<U256>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => parse_quantity(s).map(Some),
        Value::Number(n) => parse_quantity(&n.to_string()).map(Some),
        other => Err(EngineError::InvalidQuote(format!("unexpected quantity {}", other))),
    }
}

fn string_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn chain_id(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or_default()
}

impl Quote {
    /// Parse a `/quote` response body.
    ///
    /// EVM quotes need `transactionRequest.to` and `data`; Solana quotes need `data`.
    pub fn from_response(body: Value, solana: bool) -> EngineResult<Self> {
        let tx = body.get("transactionRequest").cloned().unwrap_or(Value::Null);
        let estimate = body.get("estimate").cloned().unwrap_or(Value::Null);
        let action = body.get("action").cloned().unwrap_or(Value::Null);

        let to_contract = tx["to"].as_str().filter(|s| !s.is_empty()).map(str::to_string);
        let call_data = tx["data"].as_str().unwrap_or_default().to_string();
        if call_data.is_empty() {
            return Err(EngineError::InvalidQuote(
                "transactionRequest.data is missing".to_string(),
            ));
        }
        if !solana && to_contract.is_none() {
            return Err(EngineError::InvalidQuote(
                "transactionRequest.to is missing".to_string(),
            ));
        }

        let gas_limit = quantity(&tx["gasLimit"])?
            .map(|g| {
                u64::try_from(g).map_err(|_| EngineError::InvalidQuote("gasLimit exceeds u64".into()))
            })
            .transpose()?;
        let gas_price = quantity(&tx["gasPrice"])?
            .map(|g| {
                u128::try_from(g)
                    .map_err(|_| EngineError::InvalidQuote("gasPrice exceeds u128".into()))
            })
            .transpose()?;

        Ok(Self {
            id: Uuid::new_v4(),
            tool: string_field(&body["tool"]),
            from_chain_id: chain_id(&action["fromChainId"]),
            to_chain_id: chain_id(&action["toChainId"]),
            to_contract,
            call_data,
            value: quantity(&tx["value"])?.unwrap_or_default(),
            gas_limit,
            gas_price,
            approval_address: estimate["approvalAddress"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            from_amount: string_field(&estimate["fromAmount"]),
            to_amount: string_field(&estimate["toAmount"]),
            to_amount_min: string_field(&estimate["toAmountMin"]),
            gas_costs: estimate.get("gasCosts").cloned().unwrap_or(Value::Null),
            transaction_request: tx,
            estimate,
        })
    }
}

/// Cross-chain transfer status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_tx_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_tx_link: Option<String>,
}

pub const STATUS_DONE: &str = "DONE";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_TIMEOUT: &str = "TIMEOUT";

impl BridgeStatus {
    /// Parse a `/status` body. Links may be top-level or under `sending`/`receiving`.
    pub fn from_response(body: &Value) -> Self {
        let text = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            status: text(&body["status"]).unwrap_or_else(|| "NOT_FOUND".to_string()),
            sub_status: text(&body["substatus"]).or_else(|| text(&body["subStatus"])),
            from_tx_link: text(&body["fromTxLink"]).or_else(|| text(&body["sending"]["txLink"])),
            to_tx_link: text(&body["toTxLink"]).or_else(|| text(&body["receiving"]["txLink"])),
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: STATUS_TIMEOUT.to_string(),
            sub_status: None,
            from_tx_link: None,
            to_tx_link: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status == STATUS_DONE || self.status == STATUS_FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evm_body() -> Value {
        json!({
            "id": "route-1",
            "tool": "pancakeswap",
            "action": {"fromChainId": 56, "toChainId": 56},
            "estimate": {
                "approvalAddress": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "fromAmount": "1000000",
                "toAmount": "998000",
                "toAmountMin": "993010",
                "gasCosts": [{"amount": "1234"}]
            },
            "transactionRequest": {
                "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "data": "0xdeadbeef",
                "value": "0x0de0b6b3a7640000",
                "gasLimit": "0x61a80",
                "gasPrice": "1000000000"
            }
        })
    }

    #[test]
    fn test_parse_evm_quote() {
        let quote = Quote::from_response(evm_body(), false).unwrap();
        assert_eq!(quote.tool, "pancakeswap");
        assert_eq!(quote.from_chain_id, 56);
        assert_eq!(quote.value, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(quote.gas_limit, Some(400_000));
        assert_eq!(quote.gas_price, Some(1_000_000_000));
        assert_eq!(quote.to_amount_min, "993010");
        assert!(quote.approval_address.is_some());
    }

    #[test]
    fn test_quotes_have_distinct_ids() {
        let a = Quote::from_response(evm_body(), false).unwrap();
        let b = Quote::from_response(evm_body(), false).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_missing_payload_is_invalid_quote() {
        let mut body = evm_body();
        body["transactionRequest"]["to"] = Value::Null;
        assert!(matches!(
            Quote::from_response(body.clone(), false),
            Err(EngineError::InvalidQuote(_))
        ));
        // Solana payloads carry no `to`
        assert!(Quote::from_response(body, true).is_ok());

        let no_data = json!({"transactionRequest": {"to": "0x1"}});
        assert!(matches!(
            Quote::from_response(no_data, false),
            Err(EngineError::InvalidQuote(_))
        ));
    }

    #[test]
    fn test_status_link_shapes() {
        let flat = BridgeStatus::from_response(&json!({
            "status": "PENDING",
            "fromTxLink": "https://bscscan.com/tx/0x1"
        }));
        assert_eq!(flat.from_tx_link.as_deref(), Some("https://bscscan.com/tx/0x1"));
        assert!(!flat.is_terminal());

        let nested = BridgeStatus::from_response(&json!({
            "status": "DONE",
            "substatus": "COMPLETED",
            "sending": {"txLink": "https://etherscan.io/tx/0x2"},
            "receiving": {"txLink": "https://arbiscan.io/tx/0x3"}
        }));
        assert_eq!(nested.sub_status.as_deref(), Some("COMPLETED"));
        assert_eq!(nested.to_tx_link.as_deref(), Some("https://arbiscan.io/tx/0x3"));
        assert!(nested.is_terminal());
    }
}
