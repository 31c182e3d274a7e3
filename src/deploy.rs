//! Deploys the compiled Transactions contract from a Hardhat style artifact.
//!
//! Compiling the Solidity source is left to the Solidity toolchain; this only
//! reads the `abi` and `bytecode` it produced.

use anyhow::{anyhow, bail, Context};
use ethers::{
    abi::Abi,
    contract::ContractFactory,
    providers::Middleware,
    types::{Address, Bytes},
};
use log::{debug, info};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};

pub const DEFAULT_ARTIFACT_PATH: &str = "artifacts/contracts/Transactions.sol/Transactions.json";

/// Entry points the client calls; a contract missing any of them is not
/// worth deploying.
const REQUIRED_FUNCTIONS: [&str; 2] = ["submitTransaction", "mineBlock"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub contract_name: Option<String>,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let artifact: Artifact = serde_json::from_str(json).context("malformed artifact")?;
        artifact.check()?;
        Ok(artifact)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read artifact {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid artifact {}", path.display()))
    }

    pub fn name(&self) -> &str {
        self.contract_name.as_deref().unwrap_or("Transactions")
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.bytecode.is_empty() {
            bail!("artifact has no bytecode (abstract contract or interface?)");
        }
        for name in REQUIRED_FUNCTIONS {
            self.abi
                .function(name)
                .map_err(|_| anyhow!("contract does not expose {}", name))?;
        }
        Ok(())
    }
}

/// Sends the creation transaction and waits for it to be mined
pub async fn deploy<M: Middleware + 'static>(
    artifact: Artifact,
    client: Arc<M>,
) -> anyhow::Result<Address> {
    let name = artifact.name().to_string();
    debug!(
        "(deploy) {} with {} bytes of init code",
        name,
        artifact.bytecode.len()
    );

    let factory = ContractFactory::new(artifact.abi, artifact.bytecode, client);
    let deployer = factory
        .deploy(())
        .map_err(|e| anyhow!("failed to build deployment of {}: {}", name, e))?;
    let contract = deployer
        .send()
        .await
        .map_err(|e| anyhow!("deployment of {} failed: {}", name, e))?;

    info!("(deploy) {} deployed to {:?}", name, contract.address());
    Ok(contract.address())
}
