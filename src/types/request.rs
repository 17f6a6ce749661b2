use std::fmt::Display;

use alloy::primitives::{Address, U256};
use fastnum::{D128, UD128};

use crate::{error::PlanError, num};

use super::*;

/// Token accepted as collateral by the core proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollateralType {
    token_address: Address,
    symbol: String,
    decimals: u8,
}

impl CollateralType {
    /// Collateral token with the default 18 fractional digits.
    pub fn new(token_address: Address, symbol: impl Into<String>) -> Self {
        Self {
            token_address,
            symbol: symbol.into(),
            decimals: num::DEFAULT_DECIMALS,
        }
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn token_address(&self) -> Address {
        self.token_address
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Converter between human-readable token amounts and
    /// their on-chain fixed-point representation.
    pub fn converter(&self) -> num::Converter {
        num::Converter::new(self.decimals)
    }
}

/// Desired change of a collateral/debt position.
///
/// Positive `collateral_change` deposits and delegates more collateral,
/// negative one undelegates and withdraws it. Positive `debt_change` mints
/// stablecoins against the position, negative one burns them.
#[derive(Clone, derive_more::Debug)]
pub struct PositionChangeRequest {
    account_id: AccountId,
    pool_id: PoolId,
    collateral: CollateralType,
    #[debug("{collateral_change}")]
    collateral_change: D128,
    #[debug("{debt_change}")]
    debt_change: D128,
    #[debug("{current_collateral}")]
    current_collateral: UD128,
}

impl PositionChangeRequest {
    pub fn new(
        account_id: AccountId,
        pool_id: PoolId,
        collateral: CollateralType,
        collateral_change: D128,
        debt_change: D128,
        current_collateral: UD128,
    ) -> Self {
        Self {
            account_id,
            pool_id,
            collateral,
            collateral_change,
            debt_change,
            current_collateral,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub fn collateral(&self) -> &CollateralType {
        &self.collateral
    }

    pub fn collateral_change(&self) -> D128 {
        self.collateral_change
    }

    pub fn debt_change(&self) -> D128 {
        self.debt_change
    }

    /// Collateral currently delegated by the account to the pool.
    pub fn current_collateral(&self) -> UD128 {
        self.current_collateral
    }

    pub fn collateral_increases(&self) -> bool {
        self.collateral_change > D128::ZERO
    }

    pub fn collateral_decreases(&self) -> bool {
        self.collateral_change < D128::ZERO
    }

    pub fn debt_increases(&self) -> bool {
        self.debt_change > D128::ZERO
    }

    pub fn debt_decreases(&self) -> bool {
        self.debt_change < D128::ZERO
    }

    /// True when neither collateral nor debt changes.
    pub fn is_noop(&self) -> bool {
        self.collateral_change.is_zero() && self.debt_change.is_zero()
    }

    /// Magnitude of the collateral change in token fixed point, as
    /// deposited or withdrawn.
    pub fn collateral_delta(&self) -> Result<U256, PlanError> {
        let converter = self.collateral.converter();
        converter
            .to_unsigned_abs(self.collateral_change)
            .ok_or_else(|| invalid("collateral change", self.collateral_change, converter))
    }

    /// Magnitude of the collateral change in 18-decimal fixed point, as
    /// accounted by delegation.
    pub fn collateral_delta_d18(&self) -> Result<U256, PlanError> {
        let converter = num::Converter::default();
        converter
            .to_unsigned_abs(self.collateral_change)
            .ok_or_else(|| invalid("collateral change", self.collateral_change, converter))
    }

    /// Current collateral in 18-decimal fixed point.
    pub fn current_collateral_amount(&self) -> Result<U256, PlanError> {
        let converter = num::Converter::default();
        converter
            .to_unsigned(self.current_collateral)
            .ok_or_else(|| invalid("current collateral", self.current_collateral, converter))
    }

    /// Magnitude of the debt change in stablecoin fixed point.
    pub fn debt_delta(&self) -> Result<U256, PlanError> {
        let converter = num::Converter::default();
        converter
            .to_unsigned_abs(self.debt_change)
            .ok_or_else(|| invalid("debt change", self.debt_change, converter))
    }
}

fn invalid(field: &'static str, value: impl Display, converter: num::Converter) -> PlanError {
    PlanError::InvalidAmount {
        field,
        value: value.to_string(),
        decimals: converter.decimals(),
    }
}
