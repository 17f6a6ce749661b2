//! Position manager for the protocol's core proxy.
//!
//! Plans a collateral/debt change of an account and executes it either step
//! by step, asking for confirmation before every transaction, or directly.

mod config;
mod error;
mod prompt;

use std::{process::exit, time::Duration};

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use clap::Parser;
use position_flow::{
    backend::ContractBackend,
    flow::{DirectOutcome, FlowCoordinator, FlowPolicy, run_direct},
    plan::build_plan,
    steps::build_steps,
};
use tracing::{error, info, warn};
use url::Url;

use config::{CliConfig, EnvConfig};
use error::Result;

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(env_config, cli_config).await {
        error!(%e, "Position change failed");
        exit(1);
    }
}

async fn run(env_config: EnvConfig, cli_config: CliConfig) -> Result<()> {
    let request = cli_config.to_request()?;
    let deployment = env_config.deployment()?;
    let signer: PrivateKeySigner = env_config.private_key.parse()?;
    let owner = signer.address();
    let node_url = Url::parse(&env_config.node_rpc_url)?;

    // Default timeout is 30 seconds
    let timeout = Duration::from_secs(env_config.timeout_seconds.unwrap_or(30));

    let provider = DynProvider::new(
        ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_client(RpcClient::new_http(node_url)),
    );
    let backend = ContractBackend::new(provider, owner, &deployment, request.collateral())
        .with_timeout(timeout);

    let batch = build_plan(&request, deployment.core_proxy())?;
    info!(
        %owner,
        chain_id = deployment.chain_id(),
        calls = ?batch.function_names(),
        "Planned position change"
    );

    if cli_config.dry_run {
        let results = backend.simulate(&batch).await?;
        let gas = backend.estimate_gas(&batch).await?;
        info!(results = results.len(), gas, "Simulation succeeded");
        return Ok(());
    }

    let context = backend.load_context(&request).await?;

    if cli_config.direct {
        if cli_config.infinite_approval || cli_config.use_wrapped_balance {
            warn!("Direct execution wraps and approves the exact deposit, option flags ignored");
        }
        match run_direct(&request, &batch, &context, &backend).await? {
            DirectOutcome::Completed { steps } => info!(steps, "Position updated"),
            DirectOutcome::NothingAttempted => info!("Nothing to do"),
        }
        return Ok(());
    }

    let mut coordinator = FlowCoordinator::new(FlowPolicy::Reject);
    coordinator.present(build_steps(&request, &batch, &context)?, batch)?;
    if let Some(flow) = coordinator.active_mut() {
        prompt::elect_options(
            flow,
            cli_config.infinite_approval,
            cli_config.use_wrapped_balance,
        );
    }
    let flow_id = prompt::run_interactive(&mut coordinator, &backend).await?;
    info!(flow_id, "Position updated");
    Ok(())
}
