//! Error types for the position manager.

use position_flow::error::{CoreError, FlowError, PlanError};

use crate::config::ConfigError;

/// Main error type for the position manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error("Alloy signer error: {0}")]
    AlloySigner(#[from] alloy::signers::local::LocalSignerError),

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] alloy::primitives::hex::FromHexError),

    #[error("Provider error: {0}")]
    Provider(#[from] CoreError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Transaction flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transaction flow cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
