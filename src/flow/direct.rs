use alloy::primitives::U256;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    backend::PositionBackend,
    error::{FlowError, PlanError},
    plan::CallBatch,
    steps::{Step, StepAction, StepContext, build_steps},
    types::PositionChangeRequest,
};

/// State of a direct execution.
///
/// `Succeeded` and `Failed` are idle states as well, telling how
/// the last execution ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirectState {
    #[default]
    Idle,
    Wrapping,
    Approving,
    Executing,
    Unwrapping,
    Succeeded,
    Failed,
}

impl DirectState {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::Wrapping | Self::Approving | Self::Executing | Self::Unwrapping
        )
    }
}

impl From<StepAction> for DirectState {
    fn from(value: StepAction) -> Self {
        match value {
            StepAction::Wrap { .. } => Self::Wrapping,
            StepAction::Approve { .. } => Self::Approving,
            StepAction::Execute => Self::Executing,
            StepAction::Unwrap { .. } => Self::Unwrapping,
        }
    }
}

/// How a direct execution ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectOutcome {
    /// All steps succeeded.
    Completed { steps: usize },
    /// The batch was empty, nothing was sent.
    NothingAttempted,
}

/// Executes the steps of a position change without user interaction.
#[derive(Debug)]
pub struct DirectRunner {
    state: watch::Sender<DirectState>,
}

impl Default for DirectRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectRunner {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(DirectState::Idle),
        }
    }

    /// Receiver of every state transition.
    pub fn subscribe(&self) -> watch::Receiver<DirectState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DirectState {
        *self.state.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Wrap native collateral being deposited, approve the exact deposit,
    /// execute the batch and unwrap native collateral being withdrawn.
    ///
    /// Stops at the first failing step. The backend is asked to refetch only
    /// after every step succeeded. A runner drives one execution at a time,
    /// its state always belongs to the last one started.
    pub async fn run<B: PositionBackend>(
        &mut self,
        request: &PositionChangeRequest,
        batch: &CallBatch,
        context: &StepContext,
        backend: &B,
    ) -> Result<DirectOutcome, FlowError> {
        if batch.is_empty() {
            info!("Empty call batch, nothing to execute");
            return Ok(DirectOutcome::NothingAttempted);
        }

        let steps = direct_steps(request, batch, context)?;
        for (index, step) in steps.iter().enumerate() {
            self.state.send_replace(step.action().into());
            info!(step = index, title = step.title(), "Running transaction step");

            if let Err(source) = step.run(backend, batch).await {
                warn!(step = index, %source, "Direct execution failed");
                self.state.send_replace(DirectState::Failed);
                return Err(FlowError::StepFailed {
                    index,
                    title: step.title().to_string(),
                    source,
                });
            }
        }

        self.state.send_replace(DirectState::Succeeded);
        info!(steps = steps.len(), "Direct execution completed");
        backend.refetch();
        Ok(DirectOutcome::Completed { steps: steps.len() })
    }
}

/// Execute the position change straight away, see [`DirectRunner::run`].
pub async fn run_direct<B: PositionBackend>(
    request: &PositionChangeRequest,
    batch: &CallBatch,
    context: &StepContext,
    backend: &B,
) -> Result<DirectOutcome, FlowError> {
    DirectRunner::new()
        .run(request, batch, context, backend)
        .await
}

/// Direct execution always wraps the full deposit and approves exactly it,
/// regardless of existing balance or allowance.
fn direct_steps(
    request: &PositionChangeRequest,
    batch: &CallBatch,
    context: &StepContext,
) -> Result<Vec<Step>, PlanError> {
    let context = StepContext {
        wrapped_balance: U256::ZERO,
        approval_required: true,
        ..context.clone()
    };
    build_steps(request, batch, &context)
}
