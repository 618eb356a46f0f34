//! Approve, revoke and allowance reads.

use alloy::primitives::{Address, U256};

use crate::allowance::{is_unlimited, ApprovalEntry};
use crate::amount::parse_approve_amount;
use crate::chains::{ChainConfig, ChainFamily};
use crate::engine::types::{
    AllowanceResponse, ApproveRequest, ApproveResponse, CheckAllowanceRequest,
    ListApprovalsRequest, RevokeRequest,
};
use crate::engine::{observed, TransactionEngine};
use crate::error::{EngineError, EngineResult};
use crate::evm;
use crate::transaction::STATUS_PENDING;

impl TransactionEngine {
    fn evm_chain(&self, name: &str) -> EngineResult<&ChainConfig> {
        let chain = self.ctx.registry.resolve(name)?;
        if chain.family != ChainFamily::Evm {
            return Err(EngineError::InvalidOperation(format!(
                "{} has no token allowances",
                chain.name
            )));
        }
        Ok(chain)
    }

    /// Approve `spender`. Returns once the node accepts the transaction.
    pub async fn approve(&self, request: &ApproveRequest) -> EngineResult<ApproveResponse> {
        observed("approve", &request.chain, async {
            let amount = parse_approve_amount(request.amount.as_deref())?;
            self.submit_approval(
                &request.chain,
                &request.token_address,
                &request.owner_address,
                &request.spender_address,
                amount,
            )
            .await
        })
        .await
    }

    /// Approve zero.
    pub async fn revoke(&self, request: &RevokeRequest) -> EngineResult<ApproveResponse> {
        observed(
            "revoke",
            &request.chain,
            self.submit_approval(
                &request.chain,
                &request.token_address,
                &request.owner_address,
                &request.spender_address,
                U256::ZERO,
            ),
        )
        .await
    }

    async fn submit_approval(
        &self,
        chain: &str,
        token: &str,
        owner: &str,
        spender: &str,
        amount: U256,
    ) -> EngineResult<ApproveResponse> {
        let chain = self.evm_chain(chain)?;
        let token = evm::parse_address(token)?;
        let spender = evm::parse_address(spender)?;

        let (builder, rpc) = self.ctx.evm_builder(chain, owner).await?;
        let tx_hash = self
            .ctx
            .allowance_manager(chain, rpc)
            .approve(&builder, &self.ctx.dispatcher, token, spender, amount)
            .await?;

        Ok(ApproveResponse {
            explorer_url: chain.explorer_url(&tx_hash),
            tx_hash,
            amount: amount.to_string(),
            status: STATUS_PENDING.to_string(),
        })
    }

    /// Current allowance, read live.
    pub async fn check_allowance(
        &self,
        request: &CheckAllowanceRequest,
    ) -> EngineResult<AllowanceResponse> {
        observed("check_allowance", &request.chain, async {
            let chain = self.evm_chain(&request.chain)?;
            let token = evm::parse_address(&request.token_address)?;
            let owner = evm::parse_address(&request.owner_address)?;
            let spender = evm::parse_address(&request.spender_address)?;

            let rpc = self.ctx.backends.evm(chain)?;
            let allowance = self
                .ctx
                .allowance_manager(chain, rpc)
                .check_allowance(token, owner, spender)
                .await?;
            Ok(AllowanceResponse {
                allowance: allowance.to_string(),
                is_unlimited: is_unlimited(allowance),
            })
        })
        .await
    }

    /// Standing approvals toward well-known spenders.
    pub async fn list_approvals(
        &self,
        request: &ListApprovalsRequest,
    ) -> EngineResult<Vec<ApprovalEntry>> {
        observed("list_approvals", &request.chain, async {
            let chain = self.evm_chain(&request.chain)?;
            let owner = evm::parse_address(&request.owner_address)?;
            let tokens = request
                .tokens
                .iter()
                .map(|t| evm::parse_address(t))
                .collect::<EngineResult<Vec<Address>>>()?;

            let rpc = self.ctx.backends.evm(chain)?;
            self.ctx
                .allowance_manager(chain, rpc)
                .list_approvals(owner, &tokens)
                .await
        })
        .await
    }
}
