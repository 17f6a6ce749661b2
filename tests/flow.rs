use alloy::primitives::{Address, U256};
use fastnum::{dec128, udec128};
use position_flow::{
    error::FlowError,
    flow::{DirectRunner, DirectState, FlowCoordinator, FlowProgress},
    plan,
    steps::{StepAction, StepContext, build_steps},
    testing::{self, Invocation},
};

fn wad(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(18))
}

fn native(wrapped_balance: U256) -> StepContext {
    StepContext {
        is_native_wrapped: true,
        wrapped_balance,
        ..Default::default()
    }
}

/// Skipping the wrap is offered only when the wrapped balance covers the deposit.
#[test]
fn test_wrap_skip_offered_only_with_sufficient_balance() {
    let request = testing::RequestBuilder::new()
        .symbol("weth")
        .collateral_change(dec128!(5))
        .build();
    let batch = plan::build_plan(&request, Address::ZERO).unwrap();

    let steps = build_steps(&request, &batch, &native(wad(10))).unwrap();
    assert_eq!(steps[0].title(), "Wrap ETH");
    assert!(steps[0].offers_option());
    assert_eq!(
        steps[0].checkbox_label(),
        "Skip this step and use my existing 5 wETH."
    );

    let steps = build_steps(&request, &batch, &native(wad(2))).unwrap();
    assert_eq!(steps[0].title(), "Wrap ETH");
    assert!(!steps[0].offers_option());
    assert_eq!(
        steps[0].subtitle(),
        "You must wrap your ether before depositing."
    );
    assert_eq!(steps[0].action(), StepAction::Wrap { amount: wad(5) });
}

#[test]
fn test_execute_title_joins_labels() {
    let request = testing::RequestBuilder::new()
        .symbol("snx")
        .collateral_change(dec128!(100))
        .debt_change(dec128!(-50))
        .build();
    let batch = plan::build_plan(&request, Address::ZERO).unwrap();

    let steps = build_steps(&request, &batch, &StepContext::default()).unwrap();
    let execute = steps
        .iter()
        .find(|s| s.action() == StepAction::Execute)
        .unwrap();
    assert_eq!(execute.title(), "Deposit SNX, Burn snxUSD");
}

/// Mint-only change runs as a single multicall step.
#[tokio::test]
async fn test_mint_only_end_to_end() {
    let request = testing::RequestBuilder::new()
        .debt_change(dec128!(200))
        .build();
    let batch = plan::build_plan(&request, Address::ZERO).unwrap();
    assert_eq!(batch.function_names(), vec!["mintUsd"]);

    let context = StepContext {
        approval_required: true,
        ..native(U256::ZERO)
    };
    let steps = build_steps(&request, &batch, &context).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].title(), "Mint snxUSD");

    let backend = testing::MockBackend::new();
    let mut coordinator = FlowCoordinator::default();
    let flow_id = coordinator.present(steps, batch).unwrap();
    assert_eq!(
        coordinator.run_next_step(&backend).await.unwrap(),
        FlowProgress::Completed(flow_id)
    );
    assert_eq!(
        backend.invocations(),
        vec![Invocation::Execute {
            calls: vec!["mintUsd"]
        }]
    );
    assert_eq!(backend.refetches(), 1);
}

/// A failing batch leaves the direct runner idle without refetching.
#[tokio::test]
async fn test_direct_execution_failure() {
    let request = testing::RequestBuilder::new()
        .collateral_change(dec128!(2))
        .debt_change(dec128!(10))
        .current_collateral(udec128!(3))
        .build();
    let batch = plan::build_plan(&request, Address::ZERO).unwrap();
    let backend = testing::MockBackend::new().fail_execute(1);
    let mut runner = DirectRunner::new();

    let err = runner
        .run(&request, &batch, &StepContext::default(), &backend)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::StepFailed { index: 1, .. }));
    assert_eq!(runner.state(), DirectState::Failed);
    assert!(!runner.is_loading());
    assert_eq!(backend.refetches(), 0);
    assert_eq!(
        backend.invocations(),
        vec![Invocation::Approve {
            amount: wad(2),
            infinite: false
        }]
    );
}
