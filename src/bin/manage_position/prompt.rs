//! Terminal confirmation of transaction steps.

use position_flow::{
    backend::PositionBackend,
    flow::{FlowCoordinator, FlowId, FlowProgress, TransactionFlow},
    steps::StepAction,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::error::{Error, Result};

/// Answer to a step prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Choice {
    Run,
    RunWithOption,
    RunWithoutOption,
    Cancel,
}

impl Choice {
    fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Some(Self::Run),
            "o" | "option" => Some(Self::RunWithOption),
            "w" | "without" => Some(Self::RunWithoutOption),
            "n" | "no" | "c" | "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Pre-select the options of the open flow's steps requested on the command
/// line. Steps not offering the option run unchanged.
pub fn elect_options(
    flow: &mut TransactionFlow,
    infinite_approval: bool,
    use_wrapped_balance: bool,
) {
    let elections: Vec<(usize, bool)> = flow
        .steps()
        .iter()
        .enumerate()
        .filter_map(|(index, step)| match step.action() {
            StepAction::Approve { .. } => Some((index, infinite_approval)),
            StepAction::Wrap { .. } => Some((index, use_wrapped_balance)),
            _ => None,
        })
        .collect();

    for (index, checked) in elections {
        if checked && !flow.set_checked(index, true) {
            warn!(step = index, "Option not offered, step runs unchanged");
        }
    }
}

/// Ask for confirmation before each step of the open flow and run it.
///
/// Answering yes keeps the step's current option selection.
///
/// A failed step is reported and prompted for again, so it can be retried or
/// the flow cancelled.
pub async fn run_interactive<B: PositionBackend>(
    coordinator: &mut FlowCoordinator,
    backend: &B,
) -> Result<FlowId> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(flow) = coordinator.active_mut() else {
            return Err(Error::Cancelled);
        };
        let index = flow.cursor();
        let step = &flow.steps()[index];
        println!("\n[{}/{}] {}", index + 1, flow.steps().len(), step.title());
        if !step.subtitle().is_empty() {
            println!("    {}", step.subtitle());
        }
        let has_option = step.offers_option();
        if has_option {
            let mark = if step.checked() { "x" } else { " " };
            println!("    [{mark}] (o) {}", step.checkbox_label());
        }

        let choice = ask(&mut lines, has_option).await?;
        match choice {
            Choice::Cancel => {
                coordinator.cancel();
                return Err(Error::Cancelled);
            }
            Choice::RunWithOption => {
                flow.set_checked(index, true);
            }
            Choice::RunWithoutOption => {
                flow.set_checked(index, false);
            }
            Choice::Run => {}
        }

        match coordinator.run_next_step(backend).await {
            Ok(FlowProgress::Completed(flow_id)) => return Ok(flow_id),
            Ok(FlowProgress::StepCompleted { .. }) => {}
            Err(e) if e.failed_step().is_some() => {
                warn!(%e, "Step failed, it can be retried");
                println!("    failed: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn ask(lines: &mut Lines<BufReader<Stdin>>, has_option: bool) -> Result<Choice> {
    loop {
        if has_option {
            println!("Run step? [Y/o/w/n]");
        } else {
            println!("Run step? [Y/n]");
        }
        let Some(answer) = lines.next_line().await? else {
            return Ok(Choice::Cancel);
        };
        match Choice::parse(&answer) {
            Some(Choice::RunWithOption | Choice::RunWithoutOption) if !has_option => {}
            Some(choice) => return Ok(choice),
            None => {}
        }
    }
}
