//! Execution of transaction steps.
//!
//! [`FlowCoordinator`] keeps at most one open interactive flow whose steps are
//! run one at a time at the user's pace, while [`run_direct`] executes
//! the whole sequence straight away. Both publish their progress on
//! [`tokio::sync::watch`] channels.

mod direct;
mod interactive;

pub use direct::*;
pub use interactive::*;
