//! Test utilities.
//!
//! [`RequestBuilder`] provides a convenient way to create position change requests
//! with controlled values, while [`MockBackend`] records every backend invocation
//! and can be told to fail a number of upcoming ones.
//!

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use alloy::primitives::{Address, U256};
use fastnum::{D128, UD128};

use crate::{
    backend::PositionBackend,
    error::{CoreError, ProviderError, RevertReason},
    plan::CallBatch,
    types::{AccountId, CollateralType, PoolId, PositionChangeRequest},
};

/// Builder of [`PositionChangeRequest`]s, with no change of a 18-decimal `SNX`
/// collateral by default.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    account_id: AccountId,
    pool_id: PoolId,
    token_address: Address,
    symbol: String,
    decimals: u8,
    collateral_change: D128,
    debt_change: D128,
    current_collateral: UD128,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            account_id: 1,
            pool_id: 1,
            token_address: Address::repeat_byte(0x5a),
            symbol: "snx".to_string(),
            decimals: 18,
            collateral_change: D128::ZERO,
            debt_change: D128::ZERO,
            current_collateral: UD128::ZERO,
        }
    }

    pub fn account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn pool_id(mut self, pool_id: PoolId) -> Self {
        self.pool_id = pool_id;
        self
    }

    pub fn token_address(mut self, token_address: Address) -> Self {
        self.token_address = token_address;
        self
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn collateral_change(mut self, change: D128) -> Self {
        self.collateral_change = change;
        self
    }

    pub fn debt_change(mut self, change: D128) -> Self {
        self.debt_change = change;
        self
    }

    pub fn current_collateral(mut self, amount: UD128) -> Self {
        self.current_collateral = amount;
        self
    }

    pub fn build(self) -> PositionChangeRequest {
        PositionChangeRequest::new(
            self.account_id,
            self.pool_id,
            CollateralType::new(self.token_address, self.symbol).with_decimals(self.decimals),
            self.collateral_change,
            self.debt_change,
            self.current_collateral,
        )
    }
}

/// Successful invocation of a [`MockBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Wrap { amount: U256 },
    Unwrap { amount: U256 },
    Approve { amount: U256, infinite: bool },
    Execute { calls: Vec<&'static str> },
}

#[derive(Debug, Default)]
struct Failures {
    wrap: usize,
    unwrap: usize,
    approve: usize,
    execute: usize,
}

/// In-memory [`PositionBackend`].
#[derive(Debug, Default)]
pub struct MockBackend {
    invocations: Mutex<Vec<Invocation>>,
    failures: Mutex<Failures>,
    refetches: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` wrap invocations.
    pub fn fail_wrap(self, times: usize) -> Self {
        self.failures.lock().unwrap().wrap = times;
        self
    }

    pub fn fail_unwrap(self, times: usize) -> Self {
        self.failures.lock().unwrap().unwrap = times;
        self
    }

    pub fn fail_approve(self, times: usize) -> Self {
        self.failures.lock().unwrap().approve = times;
        self
    }

    pub fn fail_execute(self, times: usize) -> Self {
        self.failures.lock().unwrap().execute = times;
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Number of successfully executed batches.
    pub fn executions(&self) -> usize {
        self.invocations()
            .iter()
            .filter(|inv| matches!(inv, Invocation::Execute { .. }))
            .count()
    }

    pub fn refetches(&self) -> usize {
        self.refetches.load(Ordering::SeqCst)
    }

    fn record(
        &self,
        pending_failures: impl FnOnce(&mut Failures) -> &mut usize,
        invocation: Invocation,
    ) -> Result<(), CoreError> {
        let mut failures = self.failures.lock().unwrap();
        let remaining = pending_failures(&mut failures);
        if *remaining > 0 {
            *remaining -= 1;
            return Err(ProviderError::Reverted(Box::new(RevertReason::Generic(
                format!("mock failure: {invocation:?}"),
            ))));
        }
        self.invocations.lock().unwrap().push(invocation);
        Ok(())
    }
}

impl PositionBackend for MockBackend {
    async fn wrap_native(&self, amount: U256) -> Result<(), CoreError> {
        self.record(|f| &mut f.wrap, Invocation::Wrap { amount })
    }

    async fn unwrap_native(&self, amount: U256) -> Result<(), CoreError> {
        self.record(|f| &mut f.unwrap, Invocation::Unwrap { amount })
    }

    async fn approve(&self, amount: U256, infinite: bool) -> Result<(), CoreError> {
        self.record(|f| &mut f.approve, Invocation::Approve { amount, infinite })
    }

    async fn execute(&self, batch: &CallBatch) -> Result<(), CoreError> {
        self.record(
            |f| &mut f.execute,
            Invocation::Execute {
                calls: batch.function_names(),
            },
        )
    }

    fn refetch(&self) {
        self.refetches.fetch_add(1, Ordering::SeqCst);
    }
}
