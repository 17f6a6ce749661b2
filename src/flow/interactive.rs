use std::collections::VecDeque;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    backend::PositionBackend,
    error::FlowError,
    plan::CallBatch,
    steps::Step,
};

/// ID of a transaction flow, unique within its coordinator.
pub type FlowId = u64;

/// What happens when a flow is presented while another one is open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowPolicy {
    /// The open flow is abandoned in favor of the new one.
    #[default]
    Replace,
    /// The new flow is refused with [`FlowError::FlowInProgress`].
    Reject,
    /// The new flow opens once the current one completes or is cancelled.
    Queue,
}

/// Steps of a single position change together with the batch they execute.
#[derive(Clone, Debug)]
pub struct TransactionFlow {
    id: FlowId,
    steps: Vec<Step>,
    batch: CallBatch,
    cursor: usize,
    failed_step: Option<usize>,
}

impl TransactionFlow {
    fn new(id: FlowId, steps: Vec<Step>, batch: CallBatch) -> Self {
        Self {
            id,
            steps,
            batch,
            cursor: 0,
            failed_step: None,
        }
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn batch(&self) -> &CallBatch {
        &self.batch
    }

    /// Index of the next step to run.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Step the flow halted at, until it is retried successfully.
    pub fn failed_step(&self) -> Option<usize> {
        self.failed_step
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Elect the option of a step which has not run yet.
    pub fn set_checked(&mut self, index: usize, checked: bool) -> bool {
        if index < self.cursor {
            return false;
        }
        self.steps
            .get_mut(index)
            .map(|step| step.set_checked(checked))
            .unwrap_or(false)
    }
}

/// Published state of the coordinator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub flow_id: Option<FlowId>,
    pub is_open: bool,
    pub cursor: usize,
    pub steps: usize,
    pub failed_step: Option<usize>,
    pub queued: usize,
}

/// Result of running a single step of the open flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowProgress {
    /// The step succeeded and more steps remain.
    StepCompleted { flow_id: FlowId, index: usize },
    /// The last step succeeded and the flow closed.
    Completed(FlowId),
}

/// Single-flight slot for interactive transaction flows.
#[derive(Debug)]
pub struct FlowCoordinator {
    policy: FlowPolicy,
    next_id: FlowId,
    active: Option<TransactionFlow>,
    queued: VecDeque<TransactionFlow>,
    status: watch::Sender<FlowSnapshot>,
}

impl Default for FlowCoordinator {
    fn default() -> Self {
        Self::new(FlowPolicy::default())
    }
}

impl FlowCoordinator {
    pub fn new(policy: FlowPolicy) -> Self {
        Self {
            policy,
            next_id: 1,
            active: None,
            queued: VecDeque::new(),
            status: watch::Sender::new(FlowSnapshot::default()),
        }
    }

    pub fn policy(&self) -> FlowPolicy {
        self.policy
    }

    /// Receiver of every state transition of the coordinator.
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.status.subscribe()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.status.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&TransactionFlow> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut TransactionFlow> {
        self.active.as_mut()
    }

    /// Open a flow of the steps executing the batch.
    ///
    /// Flows without steps or without calls are rejected with
    /// [`FlowError::EmptyFlow`].
    ///
    /// If another flow is open, the coordinator policy decides whether the new flow
    /// replaces it, is rejected or waits in the queue.
    pub fn present(&mut self, steps: Vec<Step>, batch: CallBatch) -> Result<FlowId, FlowError> {
        if steps.is_empty() || batch.is_empty() {
            return Err(FlowError::EmptyFlow);
        }

        if let Some(active_id) = self.active.as_ref().map(TransactionFlow::id) {
            match self.policy {
                FlowPolicy::Reject => return Err(FlowError::FlowInProgress(active_id)),
                FlowPolicy::Replace => {
                    warn!(flow_id = active_id, "Replacing open transaction flow");
                }
                FlowPolicy::Queue => {
                    let flow = self.create(steps, batch);
                    let flow_id = flow.id;
                    info!(flow_id, waiting_for = active_id, "Queued transaction flow");
                    self.queued.push_back(flow);
                    self.publish();
                    return Ok(flow_id);
                }
            }
        }

        let flow = self.create(steps, batch);
        let flow_id = flow.id;
        info!(flow_id, steps = flow.steps.len(), "Opened transaction flow");
        self.active = Some(flow);
        self.publish();
        Ok(flow_id)
    }

    /// Abandon the open flow, opening the next queued one if any.
    pub fn cancel(&mut self) -> Option<FlowId> {
        let cancelled = self.active.take().map(|flow| flow.id);
        if let Some(flow_id) = cancelled {
            info!(flow_id, "Cancelled transaction flow");
        }
        self.advance_queue();
        self.publish();
        cancelled
    }

    /// Run the next step of the open flow.
    ///
    /// A failing step halts the flow at that step; calling again retries it.
    /// After the last step the flow closes and the backend is asked to refetch.
    pub async fn run_next_step<B: PositionBackend>(
        &mut self,
        backend: &B,
    ) -> Result<FlowProgress, FlowError> {
        let flow = self.active.as_mut().ok_or(FlowError::NoActiveFlow)?;
        let index = flow.cursor;
        let step = &flow.steps[index];
        info!(flow_id = flow.id, step = index, title = step.title(), "Running transaction step");

        if let Err(source) = step.run(backend, &flow.batch).await {
            warn!(flow_id = flow.id, step = index, %source, "Transaction step failed");
            let title = step.title().to_string();
            flow.failed_step = Some(index);
            self.publish();
            return Err(FlowError::StepFailed {
                index,
                title,
                source,
            });
        }

        flow.failed_step = None;
        flow.cursor += 1;
        let flow_id = flow.id;

        if !flow.is_finished() {
            self.publish();
            return Ok(FlowProgress::StepCompleted { flow_id, index });
        }

        info!(flow_id, "Transaction flow completed");
        self.active = None;
        self.advance_queue();
        self.publish();
        backend.refetch();
        Ok(FlowProgress::Completed(flow_id))
    }

    /// Run the remaining steps of the open flow in order.
    pub async fn run_to_completion<B: PositionBackend>(
        &mut self,
        backend: &B,
    ) -> Result<FlowId, FlowError> {
        loop {
            if let FlowProgress::Completed(flow_id) = self.run_next_step(backend).await? {
                return Ok(flow_id);
            }
        }
    }

    fn create(&mut self, steps: Vec<Step>, batch: CallBatch) -> TransactionFlow {
        let flow = TransactionFlow::new(self.next_id, steps, batch);
        self.next_id += 1;
        flow
    }

    fn advance_queue(&mut self) {
        if self.active.is_none() {
            self.active = self.queued.pop_front();
            if let Some(flow) = &self.active {
                info!(flow_id = flow.id, "Opened queued transaction flow");
            }
        }
    }

    fn publish(&self) {
        let snapshot = match &self.active {
            Some(flow) => FlowSnapshot {
                flow_id: Some(flow.id),
                is_open: true,
                cursor: flow.cursor,
                steps: flow.steps.len(),
                failed_step: flow.failed_step,
                queued: self.queued.len(),
            },
            None => FlowSnapshot {
                queued: self.queued.len(),
                ..Default::default()
            },
        };
        self.status.send_replace(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256};
    use fastnum::dec128;

    use super::*;
    use crate::{
        plan::build_plan,
        steps::{StepContext, build_steps},
        testing::{Invocation, MockBackend, RequestBuilder},
    };

    fn flow(context: &StepContext) -> (Vec<Step>, CallBatch) {
        let request = RequestBuilder::new()
            .collateral_change(dec128!(3))
            .debt_change(dec128!(1))
            .build();
        let batch = build_plan(&request, Address::ZERO).unwrap();
        let steps = build_steps(&request, &batch, context).unwrap();
        (steps, batch)
    }

    fn present(
        coordinator: &mut FlowCoordinator,
        context: &StepContext,
    ) -> Result<FlowId, FlowError> {
        let (steps, batch) = flow(context);
        coordinator.present(steps, batch)
    }

    fn approving() -> StepContext {
        StepContext {
            approval_required: true,
            ..Default::default()
        }
    }

    fn native(wrapped_balance: U256) -> StepContext {
        StepContext {
            is_native_wrapped: true,
            wrapped_balance,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order_and_flow_closes() {
        let backend = MockBackend::new();
        let mut coordinator = FlowCoordinator::default();
        let status = coordinator.subscribe();

        let flow_id = present(&mut coordinator, &approving()).unwrap();
        assert!(status.borrow().is_open);

        assert_eq!(
            coordinator.run_next_step(&backend).await.unwrap(),
            FlowProgress::StepCompleted { flow_id, index: 0 }
        );
        assert_eq!(status.borrow().cursor, 1);
        assert_eq!(backend.refetches(), 0);

        assert_eq!(
            coordinator.run_next_step(&backend).await.unwrap(),
            FlowProgress::Completed(flow_id)
        );
        assert!(!coordinator.is_open());
        assert!(!status.borrow().is_open);
        assert_eq!(backend.refetches(), 1);
        assert!(matches!(
            backend.invocations()[..],
            [Invocation::Approve { infinite: false, .. }, Invocation::Execute { .. }]
        ));
    }

    #[tokio::test]
    async fn test_failed_step_halts_and_can_be_retried() {
        let backend = MockBackend::new().fail_approve(1);
        let mut coordinator = FlowCoordinator::default();
        present(&mut coordinator, &approving()).unwrap();

        let err = coordinator.run_next_step(&backend).await.unwrap_err();
        assert_eq!(err.failed_step(), Some(0));
        assert_eq!(coordinator.snapshot().failed_step, Some(0));
        assert_eq!(backend.executions(), 0);

        let flow_id = coordinator.run_to_completion(&backend).await.unwrap();
        assert_eq!(flow_id, 1);
        assert_eq!(backend.executions(), 1);
        assert_eq!(backend.refetches(), 1);
    }

    #[tokio::test]
    async fn test_infinite_approval_election() {
        let backend = MockBackend::new();
        let mut coordinator = FlowCoordinator::default();
        present(&mut coordinator, &approving()).unwrap();

        assert!(coordinator.active_mut().unwrap().set_checked(0, true));
        coordinator.run_to_completion(&backend).await.unwrap();
        assert!(matches!(
            backend.invocations()[0],
            Invocation::Approve { infinite: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_wrapped_balance_election_skips_wrap() {
        let backend = MockBackend::new();
        let mut coordinator = FlowCoordinator::default();
        present(&mut coordinator, &native(U256::MAX)).unwrap();

        assert!(coordinator.active_mut().unwrap().set_checked(0, true));
        coordinator.run_to_completion(&backend).await.unwrap();
        assert_eq!(
            backend.invocations(),
            vec![Invocation::Execute {
                calls: vec!["deposit", "delegateCollateral", "mintUsd"]
            }]
        );
    }

    #[tokio::test]
    async fn test_mandatory_wrap_ignores_election() {
        let backend = MockBackend::new();
        let mut coordinator = FlowCoordinator::default();
        present(&mut coordinator, &native(U256::ZERO)).unwrap();

        assert!(!coordinator.active_mut().unwrap().set_checked(0, true));
        assert!(!coordinator.active().unwrap().steps()[0].checked());
        coordinator.run_to_completion(&backend).await.unwrap();
        assert_eq!(
            backend.invocations()[0],
            Invocation::Wrap {
                amount: U256::from(3u64) * U256::from(10u64).pow(U256::from(18))
            }
        );
        assert_eq!(backend.executions(), 1);
    }

    #[test]
    fn test_reject_policy() {
        let mut coordinator = FlowCoordinator::new(FlowPolicy::Reject);
        let first = present(&mut coordinator, &StepContext::default()).unwrap();

        assert!(matches!(
            present(&mut coordinator, &StepContext::default()),
            Err(FlowError::FlowInProgress(id)) if id == first
        ));
        assert_eq!(coordinator.active().unwrap().id(), first);
    }

    #[test]
    fn test_replace_policy() {
        let mut coordinator = FlowCoordinator::new(FlowPolicy::Replace);
        present(&mut coordinator, &StepContext::default()).unwrap();
        let second = present(&mut coordinator, &approving()).unwrap();

        assert_eq!(coordinator.active().unwrap().id(), second);
        assert_eq!(coordinator.active().unwrap().steps().len(), 2);
    }

    #[tokio::test]
    async fn test_queue_policy_opens_next_flow() {
        let backend = MockBackend::new();
        let mut coordinator = FlowCoordinator::new(FlowPolicy::Queue);
        let first = present(&mut coordinator, &StepContext::default()).unwrap();
        let second = present(&mut coordinator, &StepContext::default()).unwrap();
        assert_eq!(coordinator.snapshot().queued, 1);

        assert_eq!(
            coordinator.run_next_step(&backend).await.unwrap(),
            FlowProgress::Completed(first)
        );
        assert_eq!(coordinator.active().unwrap().id(), second);

        assert_eq!(coordinator.cancel(), Some(second));
        assert!(!coordinator.is_open());
        assert_eq!(coordinator.snapshot(), FlowSnapshot::default());
    }

    #[test]
    fn test_empty_flow_and_no_active_flow() {
        let mut coordinator = FlowCoordinator::default();
        assert!(matches!(
            coordinator.present(vec![], CallBatch::default()),
            Err(FlowError::EmptyFlow)
        ));

        let backend = MockBackend::new();
        assert!(matches!(
            tokio_test::block_on(coordinator.run_next_step(&backend)),
            Err(FlowError::NoActiveFlow)
        ));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let mut coordinator = FlowCoordinator::default();
        let (steps, _) = flow(&StepContext::default());

        assert!(matches!(
            coordinator.present(steps, CallBatch::default()),
            Err(FlowError::EmptyFlow)
        ));
        assert!(!coordinator.is_open());
        assert_eq!(coordinator.snapshot(), FlowSnapshot::default());
    }
}
