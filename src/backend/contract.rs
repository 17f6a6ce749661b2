use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, U256},
    providers::{PendingTransactionBuilder, Provider},
};
use tracing::{debug, info};

use super::PositionBackend;
use crate::{
    Deployment,
    abi::{
        core_proxy::ICoreProxy::{self, ICoreProxyInstance},
        erc20::IERC20::{self, IERC20Instance},
        weth::IWETH::{self, IWETHInstance},
    },
    error::{CoreError, ProviderError, RevertReason},
    num,
    plan::CallBatch,
    steps::StepContext,
    types::{CollateralType, PositionChangeRequest},
};

/// Default time to wait for a transaction receipt.
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`PositionBackend`] sending transactions through an RPC provider
/// with a wallet attached.
#[derive(Debug)]
pub struct ContractBackend<P> {
    owner: Address,
    stablecoin: String,
    is_native_wrapped: bool,
    core: ICoreProxyInstance<P>,
    token: IERC20Instance<P>,
    weth: IWETHInstance<P>,
    timeout: Duration,
}

impl<P: Provider + Clone> ContractBackend<P> {
    /// Backend acting on behalf of `owner` for positions collateralized by
    /// the given collateral type.
    pub fn new(
        provider: P,
        owner: Address,
        deployment: &Deployment,
        collateral: &CollateralType,
    ) -> Self {
        Self {
            owner,
            stablecoin: deployment.stablecoin().to_string(),
            is_native_wrapped: deployment.is_wrapped_native(collateral.token_address()),
            core: ICoreProxy::new(deployment.core_proxy(), provider.clone()),
            token: IERC20::new(collateral.token_address(), provider.clone()),
            weth: IWETH::new(deployment.wrapped_native(), provider),
            timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Read the allowance and the wrapped balance the step list depends on.
    pub async fn load_context(
        &self,
        request: &PositionChangeRequest,
    ) -> Result<StepContext, CoreError> {
        let allowance_call = self.token.allowance(self.owner, *self.core.address());
        let balance_call = self.weth.balanceOf(self.owner);
        let (allowance, wrapped_balance) = futures::try_join!(
            allowance_call.call().into_future(),
            balance_call.call().into_future()
        )?;

        let required = if request.collateral_increases() {
            request
                .collateral_delta()
                .map_err(|err| CoreError::InvalidRequest(err.to_string()))?
        } else {
            U256::ZERO
        };
        debug!(
            %allowance,
            %required,
            wrapped_balance = ?num::Converter::default().from_unsigned::<2>(wrapped_balance),
            "Loaded step context"
        );

        Ok(StepContext {
            is_native_wrapped: self.is_native_wrapped,
            wrapped_balance,
            approval_required: allowance < required,
            stablecoin: self.stablecoin.clone(),
        })
    }

    /// Dry-run the batch via `eth_call`, returning per-call return data.
    pub async fn simulate(&self, batch: &CallBatch) -> Result<Vec<Bytes>, CoreError> {
        Ok(self
            .core
            .multicall(batch.calldata())
            .from(self.owner)
            .call()
            .await?)
    }

    pub async fn estimate_gas(&self, batch: &CallBatch) -> Result<u64, CoreError> {
        Ok(self
            .core
            .multicall(batch.calldata())
            .from(self.owner)
            .estimate_gas()
            .await?)
    }

    async fn confirm(&self, pending: PendingTransactionBuilder<Ethereum>) -> Result<(), CoreError> {
        let tx_hash = *pending.tx_hash();
        let receipt = pending.with_timeout(Some(self.timeout)).get_receipt().await?;
        if !receipt.status() {
            return Err(ProviderError::Reverted(Box::new(RevertReason::Unknown)));
        }
        info!(%tx_hash, block = ?receipt.block_number, "Transaction confirmed");
        Ok(())
    }
}

impl<P: Provider + Clone> PositionBackend for ContractBackend<P> {
    async fn wrap_native(&self, amount: U256) -> Result<(), CoreError> {
        let pending = self.weth.deposit().value(amount).send().await?;
        self.confirm(pending).await
    }

    async fn unwrap_native(&self, amount: U256) -> Result<(), CoreError> {
        let pending = self.weth.withdraw(amount).send().await?;
        self.confirm(pending).await
    }

    async fn approve(&self, amount: U256, infinite: bool) -> Result<(), CoreError> {
        let amount = if infinite { U256::MAX } else { amount };
        let pending = self
            .token
            .approve(*self.core.address(), amount)
            .send()
            .await?;
        self.confirm(pending).await
    }

    async fn execute(&self, batch: &CallBatch) -> Result<(), CoreError> {
        debug!(calls = ?batch.function_names(), "Sending multicall");
        let pending = self.core.multicall(batch.calldata()).send().await?;
        self.confirm(pending).await
    }
}
