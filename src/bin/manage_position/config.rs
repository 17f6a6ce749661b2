//! Configuration for the position manager.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): connection details, keys
//! - CLI arguments: the position change to perform

use alloy::primitives::Address;
use clap::Parser;
use fastnum::{D128, UD128, decimal::Context};
use position_flow::{
    Deployment,
    types::{AccountId, CollateralType, PoolId, PositionChangeRequest},
};

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Chain ID (e.g., 10 for Optimism)
    pub chain_id: u64,

    /// Core proxy contract address
    pub core_proxy_address: String,

    /// Wrapped native currency (WETH) address
    pub wrapped_native_address: String,

    /// Private key for signing transactions
    pub private_key: String,

    /// RPC URL for the node
    pub node_rpc_url: String,

    /// Symbol of the stablecoin minted against positions (default: snxUSD)
    pub stablecoin: Option<String>,

    /// Optional timeout for transaction receipts (default: 30s)
    pub timeout_seconds: Option<u64>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Parse addresses into the protocol deployment.
    pub fn deployment(&self) -> Result<Deployment, alloy::primitives::hex::FromHexError> {
        let deployment = Deployment::custom(
            self.chain_id,
            self.core_proxy_address.parse()?,
            self.wrapped_native_address.parse()?,
        );
        Ok(match &self.stablecoin {
            Some(symbol) => deployment.with_stablecoin(symbol.clone()),
            None => deployment,
        })
    }
}

/// CLI arguments describing the position change.
#[derive(Debug, Parser)]
#[command(name = "manage-position")]
#[command(about = "Deposit/withdraw collateral and mint/burn stablecoins of a position")]
pub struct CliConfig {
    /// Account owning the position
    #[arg(long)]
    pub account_id: AccountId,

    /// Pool the collateral is delegated to
    #[arg(long, default_value = "1")]
    pub pool_id: PoolId,

    /// Collateral token address
    #[arg(long)]
    pub collateral_token: String,

    /// Collateral token symbol
    #[arg(long)]
    pub symbol: String,

    /// Collateral token decimals
    #[arg(long, default_value = "18")]
    pub decimals: u8,

    /// Collateral to deposit (positive) or withdraw (negative)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub collateral_change: String,

    /// Stablecoins to mint (positive) or burn (negative)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub debt_change: String,

    /// Collateral currently delegated by the account to the pool
    #[arg(long, default_value = "0")]
    pub current_collateral: String,

    /// Execute all steps without confirmation
    #[arg(long)]
    pub direct: bool,

    /// Pre-select unlimited approval of the collateral token (interactive only)
    #[arg(long)]
    pub infinite_approval: bool,

    /// Pre-select using the existing wrapped balance instead of wrapping,
    /// when it covers the deposit (interactive only)
    #[arg(long)]
    pub use_wrapped_balance: bool,

    /// Only simulate the call batch
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Convert CLI arguments into the position change request.
    pub fn to_request(&self) -> Result<PositionChangeRequest, ConfigError> {
        let token_address: Address = self
            .collateral_token
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.collateral_token.clone()))?;

        let collateral_change = D128::from_str(&self.collateral_change, Context::default())
            .map_err(|_| ConfigError::InvalidAmount("collateral_change".to_string()))?;

        let debt_change = D128::from_str(&self.debt_change, Context::default())
            .map_err(|_| ConfigError::InvalidAmount("debt_change".to_string()))?;

        let current_collateral = UD128::from_str(&self.current_collateral, Context::default())
            .map_err(|_| ConfigError::InvalidAmount("current_collateral".to_string()))?;

        if collateral_change.is_zero() && debt_change.is_zero() {
            return Err(ConfigError::NoChange);
        }

        Ok(PositionChangeRequest::new(
            self.account_id,
            self.pool_id,
            CollateralType::new(token_address, self.symbol.clone()).with_decimals(self.decimals),
            collateral_change,
            debt_change,
            current_collateral,
        ))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid amount value for {0}")]
    InvalidAmount(String),

    #[error("Invalid collateral token address: {0}")]
    InvalidAddress(String),

    #[error("Neither collateral nor debt changes")]
    NoChange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(collateral_change: &str, debt_change: &str) -> CliConfig {
        CliConfig {
            account_id: 7,
            pool_id: 1,
            collateral_token: "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a".to_string(),
            symbol: "snx".to_string(),
            decimals: 18,
            collateral_change: collateral_change.to_string(),
            debt_change: debt_change.to_string(),
            current_collateral: "100".to_string(),
            direct: false,
            infinite_approval: false,
            use_wrapped_balance: false,
            dry_run: false,
        }
    }

    #[test]
    fn test_cli_config_to_request() {
        let request = cli("-2.5", "10").to_request().unwrap();
        assert_eq!(request.account_id(), 7);
        assert!(request.collateral_decreases());
        assert!(request.debt_increases());
        assert_eq!(request.collateral().symbol(), "snx");
    }

    #[test]
    fn test_no_change_is_rejected() {
        assert!(matches!(cli("0", "0").to_request(), Err(ConfigError::NoChange)));
    }

    #[test]
    fn test_option_flags_parse() {
        let config = CliConfig::parse_from([
            "manage-position",
            "--account-id",
            "7",
            "--collateral-token",
            "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a",
            "--symbol",
            "weth",
            "--collateral-change",
            "1.5",
            "--infinite-approval",
            "--use-wrapped-balance",
        ]);
        assert!(config.infinite_approval);
        assert!(config.use_wrapped_balance);
        assert!(!config.direct);
        assert_eq!(config.debt_change, "0");
    }

    #[test]
    fn test_invalid_amount() {
        assert!(matches!(
            cli("abc", "0").to_request(),
            Err(ConfigError::InvalidAmount(field)) if field == "collateral_change"
        ));
    }
}
