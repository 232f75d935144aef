//! collstake is a CLI tool to deploy the CollStaking contracts.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;

use cli::Cli;
use collstake_deploy::{DeployConfig, DeploymentReport, RpcNetwork};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(report) => {
            println!("{}", summary(&report));
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Deployment failed");
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<DeploymentReport> {
    let mut config = DeployConfig::load(cli.config.as_deref())?;

    if let Some(rpc_url) = cli.rpc_url {
        config.network.rpc_url = rpc_url;
    }
    if let Some(network) = cli.network {
        config.network.name = network;
    }
    if let Some(artifacts) = cli.artifacts {
        config.artifacts_dir = artifacts;
    }
    if let Some(output_file) = cli.output_file {
        config.output_file = output_file;
    }
    if let Some(confirmations) = cli.confirmations {
        config.tx_confirmations = confirmations;
    }
    config.redeploy |= cli.redeploy;

    tracing::info!(
        environment = %cli.environment,
        network = %config.network.name,
        rpc_url = %config.network.rpc_url,
        artifacts_dir = %config.artifacts_dir.display(),
        confirmations = config.tx_confirmations,
        redeploy = config.redeploy,
        "Loaded deployment configuration"
    );

    let network = RpcNetwork::new(&config.network)?;
    let report = cli
        .environment
        .deploy(config, network)
        .await
        .context("Failed to deploy the CollStaking contracts")?;

    // Saved after the run so that deployed dependency addresses are included
    if cli.save_config {
        report.config.save_config()?;
    }

    Ok(report)
}

/// A table of every deployment recorded for the network.
fn summary(report: &DeploymentReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Deployment", "Artifact", "Address", "Implementation"]);

    for (name, record) in report.manifest.deployments() {
        table.add_row(vec![
            name.clone(),
            record.artifact.clone(),
            record.address.to_string(),
            record
                .implementation
                .map(|address| address.to_string())
                .unwrap_or_default(),
        ]);
    }

    table
}
