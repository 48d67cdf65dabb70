//! Warden agent binary.
//!
//! This is the main entry point for the Warden agent, which bridges the
//! HTTP chat and check API to the P2P network.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use warden_node::cli::Cli;
use warden_node::config::NodeConfig;
use warden_node::node::Node;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Build configuration
    let config = NodeConfig::from_cli(&cli);

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Warden agent v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Failed to start agent: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let node = Node::new(config)?;
    node.run().await
}
