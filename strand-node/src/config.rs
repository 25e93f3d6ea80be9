//! Node configuration.

use std::net::SocketAddr;

use strand_diffusion::{AttackTarget, AttackType, DiffusionConfig, PeerId, SecurityParams};

use crate::cli::Cli;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Listen address for inbound conversations.
    pub listen_addr: SocketAddr,

    /// Known peers.
    pub peers: Vec<(PeerId, SocketAddr)>,

    /// Length of the generated local chain.
    pub chain_length: usize,

    /// Slots per epoch of the generated chain.
    pub slots_per_epoch: u64,

    /// Stay in recovery mode for the node's lifetime.
    pub recovery: bool,

    /// Catch up from peers at startup.
    pub catch_up: bool,

    /// Diffusion settings.
    pub diffusion: DiffusionConfig,

    /// Attack-simulation policy handed to the local chain.
    pub security: SecurityParams,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        let security = if cli.attack_target.is_empty() {
            SecurityParams::default()
        } else {
            SecurityParams {
                attack_types: vec![AttackType::NoBlocks],
                attack_targets: cli
                    .attack_target
                    .iter()
                    .copied()
                    .map(AttackTarget::Network)
                    .collect(),
            }
        };

        let mut diffusion = DiffusionConfig::new();
        if let Some(count) = cli.max_blocks_per_request {
            diffusion = diffusion.with_max_blocks_per_request(count);
        }

        Self {
            listen_addr: cli.listen,
            peers: cli.peers.clone(),
            chain_length: cli.chain_length,
            slots_per_epoch: cli.slots_per_epoch,
            recovery: cli.recovery,
            catch_up: cli.catch_up,
            diffusion,
            security,
            log_level: cli.log_level.clone(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            peers: Vec::new(),
            chain_length: 100,
            slots_per_epoch: 10,
            recovery: false,
            catch_up: false,
            diffusion: DiffusionConfig::default(),
            security: SecurityParams::default(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.listen_addr.port(), 3000);
        assert!(config.peers.is_empty());
        assert!(!config.catch_up);
        assert!(config.security.attack_types.is_empty());
    }

    #[test]
    fn test_from_cli() {
        let cli = Cli::parse_from([
            "strand-node",
            "--listen",
            "127.0.0.1:4000",
            "--peer",
            "7=127.0.0.1:4001",
            "--chain-length",
            "20",
            "--catch-up",
            "--max-blocks-per-request",
            "50",
        ]);
        let config = NodeConfig::from_cli(&cli);

        assert_eq!(config.listen_addr.port(), 4000);
        assert_eq!(config.peers, vec![(PeerId(7), "127.0.0.1:4001".parse().unwrap())]);
        assert_eq!(config.chain_length, 20);
        assert!(config.catch_up);
        assert_eq!(config.diffusion.max_blocks_per_request, 50);
    }

    #[test]
    fn test_attack_targets_enable_no_blocks() {
        let cli = Cli::parse_from(["strand-node", "--attack-target", "10.0.0.1:3000"]);
        let config = NodeConfig::from_cli(&cli);

        let target: SocketAddr = "10.0.0.1:3000".parse().unwrap();
        let other: SocketAddr = "10.0.0.2:3000".parse().unwrap();
        assert!(config.security.targets_no_blocks(&target));
        assert!(!config.security.targets_no_blocks(&other));
    }
}
