//! User-facing transaction steps around a call batch.
//!
//! A position change may need up to four transactions: wrapping native
//! currency, approving the collateral transfer, the batch itself and
//! unwrapping withdrawn collateral. [`build_steps`] decides which of them
//! are needed and which ones offer the user an option; it never skips a
//! step on its own.

use alloy::primitives::U256;
use itertools::Itertools;

use crate::{
    DEFAULT_STABLECOIN,
    backend::PositionBackend,
    error::{CoreError, PlanError},
    plan::CallBatch,
    types::PositionChangeRequest,
};

/// On-chain facts the step list depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepContext {
    /// Collateral is the wrapped native currency.
    pub is_native_wrapped: bool,
    /// Wrapped native currency already held by the owner.
    pub wrapped_balance: U256,
    /// Current allowance does not cover the deposited amount.
    pub approval_required: bool,
    pub stablecoin: String,
}

impl Default for StepContext {
    fn default() -> Self {
        Self {
            is_native_wrapped: false,
            wrapped_balance: U256::ZERO,
            approval_required: false,
            stablecoin: DEFAULT_STABLECOIN.to_string(),
        }
    }
}

/// What a step does when run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepAction {
    /// Wrap the amount of native currency, unless the user opted to
    /// use the existing wrapped balance.
    Wrap { amount: U256 },
    /// Approve the core proxy to transfer the amount, or an unlimited
    /// amount if the user opted so.
    Approve { amount: U256 },
    /// Execute the call batch as a single multicall.
    Execute,
    Unwrap { amount: U256 },
}

/// Single user-facing transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    title: String,
    subtitle: String,
    action: StepAction,
    checkbox_label: String,
    checked: bool,
}

impl Step {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        action: StepAction,
        checkbox_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            action,
            checkbox_label: checkbox_label.into(),
            checked: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn action(&self) -> StepAction {
        self.action
    }

    /// Label of the user option, empty when none is offered.
    pub fn checkbox_label(&self) -> &str {
        &self.checkbox_label
    }

    pub fn offers_option(&self) -> bool {
        !self.checkbox_label.is_empty()
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    /// Elect the step option. Ignored when the step offers none.
    pub fn set_checked(&mut self, checked: bool) -> bool {
        if self.offers_option() {
            self.checked = checked;
        }
        self.checked
    }

    /// Run the step action against the backend.
    pub async fn run<B: PositionBackend>(
        &self,
        backend: &B,
        batch: &CallBatch,
    ) -> Result<(), CoreError> {
        let elected = self.checked && self.offers_option();
        match self.action {
            StepAction::Wrap { amount } => {
                if elected {
                    Ok(())
                } else {
                    backend.wrap_native(amount).await
                }
            }
            StepAction::Approve { amount } => backend.approve(amount, elected).await,
            StepAction::Execute => backend.execute(batch).await,
            StepAction::Unwrap { amount } => backend.unwrap_native(amount).await,
        }
    }
}

/// Build the ordered steps realizing the call batch.
///
/// * Wrap, for native collateral being deposited. Skipping it is offered only
///   when the wrapped balance already covers the deposit.
/// * Approve, for collateral being deposited without sufficient allowance.
/// * Execute, always.
/// * Unwrap, for native collateral being withdrawn.
pub fn build_steps(
    request: &PositionChangeRequest,
    _batch: &CallBatch,
    context: &StepContext,
) -> Result<Vec<Step>, PlanError> {
    let symbol = request.collateral().symbol().to_uppercase();
    let delta = request.collateral_delta()?;
    let mut steps = Vec::with_capacity(4);

    if context.is_native_wrapped && request.collateral_increases() {
        let must_wrap = delta > context.wrapped_balance;
        steps.push(Step::new(
            "Wrap ETH",
            if must_wrap {
                "You must wrap your ether before depositing."
            } else {
                ""
            },
            StepAction::Wrap { amount: delta },
            if must_wrap {
                String::new()
            } else {
                format!(
                    "Skip this step and use my existing {} wETH.",
                    request.collateral_change()
                )
            },
        ));
    }

    if request.collateral_increases() && context.approval_required {
        steps.push(Step::new(
            format!("Approve {symbol} transfer"),
            "",
            StepAction::Approve { amount: delta },
            format!("Approve unlimited {symbol} transfers to Synthetix."),
        ));
    }

    steps.push(Step::new(
        execute_title(request, &context.stablecoin),
        "This is a multicall.",
        StepAction::Execute,
        "",
    ));

    if context.is_native_wrapped && request.collateral_decreases() {
        steps.push(Step::new(
            "Unwrap ETH",
            "Convert wETH to native ETH.",
            StepAction::Unwrap { amount: delta },
            "",
        ));
    }

    Ok(steps)
}

/// Comma-joined labels of the actions performed by the batch.
pub fn execute_title(request: &PositionChangeRequest, stablecoin: &str) -> String {
    let symbol = request.collateral().symbol().to_uppercase();
    let collateral = if request.collateral_increases() {
        Some(format!("Deposit {symbol}"))
    } else if request.collateral_decreases() {
        Some(format!("Withdraw {symbol}"))
    } else {
        None
    };
    let debt = if request.debt_increases() {
        Some(format!("Mint {stablecoin}"))
    } else if request.debt_decreases() {
        Some(format!("Burn {stablecoin}"))
    } else {
        None
    };
    collateral.into_iter().chain(debt).join(", ")
}
