//! Translation of a position change into core proxy calls.
//!
//! [`build_plan`] is pure: it does no I/O and depends only on the request,
//! so the resulting [`CallBatch`] can be inspected, simulated or executed
//! via a single `multicall` transaction.

use alloy::primitives::{Address, Bytes, U256};
use alloy_sol_types::SolInterface;

use crate::{
    abi::core_proxy::ICoreProxy::{
        self, ICoreProxyCalls, burnUsdCall, delegateCollateralCall, depositCall, mintUsdCall,
        withdrawCall,
    },
    error::PlanError,
    num,
    types::PositionChangeRequest,
};

/// Single core proxy invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    target: Address,
    call: ICoreProxyCalls,
}

impl Call {
    pub fn new(target: Address, call: ICoreProxyCalls) -> Self {
        Self { target, call }
    }

    pub fn target(&self) -> Address {
        self.target
    }

    /// Typed function and arguments.
    pub fn call(&self) -> &ICoreProxyCalls {
        &self.call
    }

    pub fn function_name(&self) -> &'static str {
        match &self.call {
            ICoreProxyCalls::deposit(_) => "deposit",
            ICoreProxyCalls::withdraw(_) => "withdraw",
            ICoreProxyCalls::delegateCollateral(_) => "delegateCollateral",
            ICoreProxyCalls::mintUsd(_) => "mintUsd",
            ICoreProxyCalls::burnUsd(_) => "burnUsd",
            ICoreProxyCalls::multicall(_) => "multicall",
        }
    }

    /// ABI-encoded call data, selector included.
    pub fn calldata(&self) -> Bytes {
        Bytes::from(self.call.abi_encode())
    }
}

/// Ordered calls realizing one position change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallBatch {
    calls: Vec<Call>,
}

impl CallBatch {
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn function_names(&self) -> Vec<&'static str> {
        self.calls.iter().map(Call::function_name).collect()
    }

    /// Payload of the `multicall` invocation executing the whole batch.
    pub fn calldata(&self) -> Vec<Bytes> {
        self.calls.iter().map(Call::calldata).collect()
    }

    /// `(target, calldata)` pairs in execution order.
    pub fn encoded(&self) -> Vec<(Address, Bytes)> {
        self.calls
            .iter()
            .map(|call| (call.target, call.calldata()))
            .collect()
    }

    /// The whole batch wrapped into a single `multicall`.
    pub fn to_multicall(&self) -> ICoreProxy::multicallCall {
        ICoreProxy::multicallCall {
            data: self.calldata(),
        }
    }
}

/// Build the ordered core proxy calls realizing the requested change.
///
/// Calls are emitted in a fixed order: deposit and delegation increase,
/// stablecoin burn, stablecoin mint, delegation decrease and withdrawal.
/// Delegation always follows a deposit and always precedes a withdrawal.
///
/// Deposit and withdrawal amounts are in the token's decimals, delegation,
/// stablecoin and leverage amounts in 18 decimals. Amounts that cannot be
/// represented exactly are rejected with [`PlanError::InvalidAmount`].
///
/// Returns an empty batch when neither collateral nor debt changes.
pub fn build_plan(
    request: &PositionChangeRequest,
    core_proxy: Address,
) -> Result<CallBatch, PlanError> {
    let account_id = request.account_id();
    let pool_id = request.pool_id();
    let collateral_type = request.collateral().token_address();
    let leverage = num::Converter::default().one();

    let mut calls: Vec<ICoreProxyCalls> = Vec::with_capacity(5);

    if request.collateral_increases() {
        let token_amount = request.collateral_delta()?;
        let new_amount = request
            .current_collateral_amount()?
            .checked_add(request.collateral_delta_d18()?)
            .ok_or(PlanError::Overflow)?;
        calls.push(ICoreProxyCalls::deposit(depositCall {
            accountId: account_id,
            collateralType: collateral_type,
            tokenAmount: token_amount,
        }));
        calls.push(delegate(request, new_amount, leverage));
    }

    if request.debt_decreases() {
        calls.push(ICoreProxyCalls::burnUsd(burnUsdCall {
            accountId: account_id,
            poolId: pool_id,
            collateralType: collateral_type,
            amount: request.debt_delta()?,
        }));
    }

    if request.debt_increases() {
        calls.push(ICoreProxyCalls::mintUsd(mintUsdCall {
            accountId: account_id,
            poolId: pool_id,
            collateralType: collateral_type,
            amount: request.debt_delta()?,
        }));
    }

    if request.collateral_decreases() {
        let token_amount = request.collateral_delta()?;
        let current = request.current_collateral_amount()?;
        let requested = request.collateral_delta_d18()?;
        let new_amount = current
            .checked_sub(requested)
            .ok_or(PlanError::InsufficientCollateral { current, requested })?;
        calls.push(delegate(request, new_amount, leverage));
        calls.push(ICoreProxyCalls::withdraw(withdrawCall {
            accountId: account_id,
            collateralType: collateral_type,
            tokenAmount: token_amount,
        }));
    }

    Ok(CallBatch {
        calls: calls
            .into_iter()
            .map(|call| Call::new(core_proxy, call))
            .collect(),
    })
}

fn delegate(request: &PositionChangeRequest, amount: U256, leverage: U256) -> ICoreProxyCalls {
    ICoreProxyCalls::delegateCollateral(delegateCollateralCall {
        accountId: request.account_id(),
        poolId: request.pool_id(),
        collateralType: request.collateral().token_address(),
        newCollateralAmountD18: amount,
        leverage,
    })
}
