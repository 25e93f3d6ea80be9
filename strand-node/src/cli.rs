//! Command-line argument parsing.

use std::net::SocketAddr;

use clap::Parser;
use strand_diffusion::PeerId;

/// Strand diffusion node.
#[derive(Parser, Debug, Clone)]
#[command(name = "strand-node")]
#[command(about = "Strand node serving and fetching blocks over TCP")]
#[command(version)]
pub struct Cli {
    /// Listen address for inbound conversations.
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Comma-separated peers as id=addr (e.g. 1=127.0.0.1:3001).
    #[arg(long = "peer", value_delimiter = ',', value_parser = parse_peer)]
    pub peers: Vec<(PeerId, SocketAddr)>,

    /// Number of blocks in the generated local chain.
    #[arg(long, default_value_t = 100)]
    pub chain_length: usize,

    /// Slots per epoch for the generated chain.
    #[arg(long, default_value_t = 10)]
    pub slots_per_epoch: u64,

    /// Stay in recovery mode and refuse to serve headers.
    #[arg(long)]
    pub recovery: bool,

    /// Catch up from the best peer tip at startup.
    #[arg(long)]
    pub catch_up: bool,

    /// Cap on blocks served for one range request.
    #[arg(long)]
    pub max_blocks_per_request: Option<usize>,

    /// Comma-separated peer addresses to simulate a NoBlocks attack against.
    #[arg(long, value_delimiter = ',')]
    pub attack_target: Vec<SocketAddr>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parse one `id=addr` peer entry.
fn parse_peer(s: &str) -> Result<(PeerId, SocketAddr), String> {
    let (id, addr) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=addr, got '{}'", s))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid peer id '{}': {}", id, e))?;
    let addr = addr
        .trim()
        .parse::<SocketAddr>()
        .map_err(|e| format!("invalid peer address '{}': {}", addr, e))?;
    Ok((PeerId(id), addr))
}
