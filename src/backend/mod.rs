//! Capabilities the transaction steps are executed with.

mod contract;

use alloy::primitives::U256;

use crate::{error::CoreError, plan::CallBatch};

pub use contract::ContractBackend;

/// Chain-facing operations needed to realize a position change.
///
/// Every mutating operation completes once the transaction is confirmed.
pub trait PositionBackend {
    /// Wrap the amount of native currency.
    fn wrap_native(&self, amount: U256) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Unwrap the amount of wrapped native currency.
    fn unwrap_native(&self, amount: U256) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Approve the core proxy to transfer collateral, either exactly
    /// `amount` or unlimited.
    fn approve(
        &self,
        amount: U256,
        infinite: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Execute the batch as a single multicall transaction.
    fn execute(&self, batch: &CallBatch) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Invoked once a whole flow succeeded, to refresh dependent state.
    fn refetch(&self) {}
}
