use std::path::PathBuf;

use clap::Parser;
use collstake_deploy::Environment;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "collstake")]
#[command(
    author,
    version,
    about = "Deploy the CollStaking contracts and their dependencies"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "COLLSTAKE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Collstake.toml configuration file, or to the directory holding it.
    ///
    /// Values from the file are layered over the defaults, then overridden by
    /// COLLSTAKE_* environment variables and finally by the flags below.
    #[arg(short, long, alias = "conf", env = "COLLSTAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The target environment.
    ///
    /// `testnet` deploys mock tokens and reward contracts for every dependency
    /// missing from the configuration. `mainnet` requires all of them.
    #[arg(short, long, env = "COLLSTAKE_ENVIRONMENT", default_value_t = Environment::Testnet)]
    pub environment: Environment,

    /// The URL of the JSON-RPC endpoint. The node must hold the signer account.
    #[arg(long, alias = "rpc", env = "COLLSTAKE_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// The network name, used as the key of the deployments in the manifest.
    #[arg(short, long, visible_alias = "name", env = "COLLSTAKE_NETWORK_NAME")]
    pub network: Option<String>,

    /// Root directory of the compiled Hardhat artifacts.
    #[arg(long, env = "COLLSTAKE_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Path of the deployment manifest.
    #[arg(short, long, env = "COLLSTAKE_OUTPUT_FILE")]
    pub output_file: Option<PathBuf>,

    /// The number of confirmations to wait for on every transaction.
    #[arg(long, env = "COLLSTAKE_CONFIRMATIONS")]
    pub confirmations: Option<u64>,

    /// Redeploy all contracts.
    /// If not provided, contracts found in the manifest with code on chain are reused.
    #[arg(long, env = "COLLSTAKE_REDEPLOY", default_value_t = false)]
    pub redeploy: bool,

    /// Save the resolved configuration to Collstake.toml next to the manifest.
    #[arg(long, env = "COLLSTAKE_SAVE_CONFIG", default_value_t = false)]
    pub save_config: bool,
}
