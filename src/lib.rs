//! Collateral/debt position management SDK.
//!
//! # Overview
//!
//! Turns a desired change of a position (collateral and/or debt) into
//! on-chain transactions against the protocol's core proxy.
//!
//! Use [`plan::build_plan`] to get the ordered [`plan::CallBatch`] realizing the
//! change, then [`steps::build_steps`] to bracket it with the wrap/approve/unwrap
//! transactions the change requires.
//!
//! Steps are executed either interactively, one at a time under user control,
//! via [`flow::FlowCoordinator`], or straight through via [`flow::run_direct`].
//! Both talk to the chain through a [`backend::PositionBackend`], with
//! [`backend::ContractBackend`] being the RPC provider based implementation.
//!
//! # Testing
//!
//! [`testing`] module provides request builders and an in-memory backend
//! recording every invocation.

pub mod abi;
pub mod backend;
pub mod error;
pub mod flow;
pub mod num;
pub mod plan;
pub mod steps;
pub mod testing;
pub mod types;

use alloy::primitives::Address;

/// Symbol of the stablecoin minted against positions.
pub const DEFAULT_STABLECOIN: &str = "snxUSD";

#[derive(Clone, Debug)]
/// Protocol deployment the positions are managed on.
pub struct Deployment {
    chain_id: u64,
    core_proxy: Address,
    wrapped_native: Address,
    stablecoin: String,
}

impl Deployment {
    pub fn custom(chain_id: u64, core_proxy: Address, wrapped_native: Address) -> Self {
        Self {
            chain_id,
            core_proxy,
            wrapped_native,
            stablecoin: DEFAULT_STABLECOIN.to_string(),
        }
    }

    pub fn with_stablecoin(mut self, symbol: impl Into<String>) -> Self {
        self.stablecoin = symbol.into();
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn core_proxy(&self) -> Address {
        self.core_proxy
    }

    /// Wrapped representation of the chain's native currency (WETH).
    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn stablecoin(&self) -> &str {
        &self.stablecoin
    }

    /// Whether the collateral token is the wrapped native currency.
    pub fn is_wrapped_native(&self, token: Address) -> bool {
        token == self.wrapped_native
    }
}
