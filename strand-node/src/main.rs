//! `strand-node`: serve a generated chain over TCP and optionally catch up
//! from the configured peers.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use strand_node::{Cli, Node, NodeConfig};

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    init_logging(&cli.log_level);

    let config = NodeConfig::from_cli(&cli);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listen_addr,
        peers = config.peers.len(),
        "Strand node"
    );

    let node = Node::new(config).context("failed to build node")?;
    node.run().await.context("node stopped with an error")
}
