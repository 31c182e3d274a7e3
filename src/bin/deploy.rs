use anyhow::{bail, Context};
use clap::Parser;
use dapp_client::{
    config::{Config, DEFAULT_CONFIG_PATH},
    deploy::{self, Artifact, DEFAULT_ARTIFACT_PATH},
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
};
use std::{path::PathBuf, sync::Arc, time::Duration};

/// Deploys the compiled Transactions contract and prints its address
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Compiled contract artifact (json with `abi` and `bytecode`)
    #[arg(long, default_value = DEFAULT_ARTIFACT_PATH)]
    artifact: PathBuf,

    /// Client config, used for the rpc endpoint and key when not given here
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long)]
    rpc_url: Option<String>,

    /// Hex encoded deployer key
    #[arg(long, env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let rpc_url = args.rpc_url.unwrap_or(config.network.rpc_url);
    let Some(key) = args.private_key.or(config.wallet.private_key) else {
        bail!("no deployer key: pass --private-key or set DEPLOYER_PRIVATE_KEY");
    };

    let artifact = Artifact::load(&args.artifact)?;

    let provider = Provider::<Http>::try_from(rpc_url.as_str())
        .with_context(|| format!("invalid rpc url {:?}", rpc_url))?
        .interval(Duration::from_millis(config.network.poll_interval_ms));
    let chain_id = provider
        .get_chainid()
        .await
        .with_context(|| format!("no node answering at {}", rpc_url))?;
    let wallet = key
        .trim()
        .parse::<LocalWallet>()
        .context("invalid deployer key")?
        .with_chain_id(chain_id.as_u64());
    let client = Arc::new(SignerMiddleware::new(provider, wallet));

    let address = deploy::deploy(artifact, client).await?;
    println!("Transactions deployed to: {:?}", address);
    println!("Set contract.address in {} to use it.", args.config.display());
    Ok(())
}
